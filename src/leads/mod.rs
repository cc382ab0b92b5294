//! Lead naming and spatial partition of the ECG image
//!
//! A standard 12-lead ECG printout lays the leads out on a 3x4 grid:
//!
//! ```text
//! I    aVR  V1  V4
//! II   aVL  V2  V5
//! III  aVF  V3  V6
//! ```
//!
//! [`LeadMapper`] partitions the image into twelve rectangular cells along
//! that layout. The partition is static reference data: built once per image
//! geometry, validated eagerly, and shared read-only by all three saliency
//! estimators.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the twelve standard ECG leads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lead {
    /// Lead I (lateral)
    I,
    /// Lead II (inferior)
    II,
    /// Lead III (inferior)
    III,
    /// Augmented vector right
    #[serde(rename = "aVR")]
    AVR,
    /// Augmented vector left
    #[serde(rename = "aVL")]
    AVL,
    /// Augmented vector foot
    #[serde(rename = "aVF")]
    AVF,
    /// Precordial lead V1 (septal)
    V1,
    /// Precordial lead V2 (septal)
    V2,
    /// Precordial lead V3 (anterior)
    V3,
    /// Precordial lead V4 (anterior)
    V4,
    /// Precordial lead V5 (lateral)
    V5,
    /// Precordial lead V6 (lateral)
    V6,
}

/// Anatomical territory a lead reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Territory {
    /// Lateral wall: I, aVL, V5, V6
    Lateral,
    /// Inferior wall: II, III, aVF
    Inferior,
    /// Septal wall: V1, V2
    Septal,
    /// Anterior wall: V3, V4
    Anterior,
    /// Global view (aVR looks into the cavity)
    Global,
}

impl Lead {
    /// Number of leads
    pub const COUNT: usize = 12;

    /// All leads in canonical display order
    ///
    /// This order is the deterministic tie-break for every ranking the
    /// engine produces.
    pub const ALL: [Lead; Lead::COUNT] = [
        Lead::I,
        Lead::II,
        Lead::III,
        Lead::AVR,
        Lead::AVL,
        Lead::AVF,
        Lead::V1,
        Lead::V2,
        Lead::V3,
        Lead::V4,
        Lead::V5,
        Lead::V6,
    ];

    /// Canonical index of this lead in [`Lead::ALL`]
    pub fn index(self) -> usize {
        match self {
            Lead::I => 0,
            Lead::II => 1,
            Lead::III => 2,
            Lead::AVR => 3,
            Lead::AVL => 4,
            Lead::AVF => 5,
            Lead::V1 => 6,
            Lead::V2 => 7,
            Lead::V3 => 8,
            Lead::V4 => 9,
            Lead::V5 => 10,
            Lead::V6 => 11,
        }
    }

    /// Lead name as printed on an ECG (e.g., "II", "aVR", "V3")
    pub fn name(self) -> &'static str {
        match self {
            Lead::I => "I",
            Lead::II => "II",
            Lead::III => "III",
            Lead::AVR => "aVR",
            Lead::AVL => "aVL",
            Lead::AVF => "aVF",
            Lead::V1 => "V1",
            Lead::V2 => "V2",
            Lead::V3 => "V3",
            Lead::V4 => "V4",
            Lead::V5 => "V5",
            Lead::V6 => "V6",
        }
    }

    /// Anatomical territory this lead belongs to
    pub fn territory(self) -> Territory {
        match self {
            Lead::I | Lead::AVL | Lead::V5 | Lead::V6 => Territory::Lateral,
            Lead::II | Lead::III | Lead::AVF => Territory::Inferior,
            Lead::V1 | Lead::V2 => Territory::Septal,
            Lead::V3 | Lead::V4 => Territory::Anterior,
            Lead::AVR => Territory::Global,
        }
    }

    /// Grid position (row, column) on the standard 3x4 printout layout
    pub fn grid_position(self) -> (usize, usize) {
        match self {
            Lead::I => (0, 0),
            Lead::AVR => (0, 1),
            Lead::V1 => (0, 2),
            Lead::V4 => (0, 3),
            Lead::II => (1, 0),
            Lead::AVL => (1, 1),
            Lead::V2 => (1, 2),
            Lead::V5 => (1, 3),
            Lead::III => (2, 0),
            Lead::AVF => (2, 1),
            Lead::V3 => (2, 2),
            Lead::V6 => (2, 3),
        }
    }
}

impl fmt::Display for Lead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Grid layout constants: 3 rows x 4 columns
const GRID_ROWS: usize = 3;
const GRID_COLS: usize = 4;

/// Rectangular pixel cell of one lead, `[x0, x1) x [y0, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadCell {
    /// Left edge (inclusive)
    pub x0: usize,
    /// Top edge (inclusive)
    pub y0: usize,
    /// Right edge (exclusive)
    pub x1: usize,
    /// Bottom edge (exclusive)
    pub y1: usize,
}

/// Static spatial partition mapping pixel coordinates to leads
///
/// Total over the image bounds: every valid coordinate maps to exactly one
/// lead. The last row and column absorb the division remainder so no pixel
/// is left unassigned.
#[derive(Debug, Clone)]
pub struct LeadMapper {
    width: usize,
    height: usize,
    cells: [LeadCell; Lead::COUNT],
}

impl LeadMapper {
    /// Build the partition for an image of the given dimensions
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the image is too small to
    /// partition into a 3x4 grid.
    pub fn new(width: usize, height: usize) -> Result<Self, AnalysisError> {
        if width < GRID_COLS || height < GRID_ROWS {
            return Err(AnalysisError::InvalidInput(format!(
                "Image {}x{} too small for a {}x{} lead grid",
                width, height, GRID_ROWS, GRID_COLS
            )));
        }

        let cell_w = width / GRID_COLS;
        let cell_h = height / GRID_ROWS;

        let mut cells = [LeadCell {
            x0: 0,
            y0: 0,
            x1: 0,
            y1: 0,
        }; Lead::COUNT];

        for lead in Lead::ALL {
            let (row, col) = lead.grid_position();
            cells[lead.index()] = LeadCell {
                x0: col * cell_w,
                y0: row * cell_h,
                x1: if col == GRID_COLS - 1 {
                    width
                } else {
                    (col + 1) * cell_w
                },
                y1: if row == GRID_ROWS - 1 {
                    height
                } else {
                    (row + 1) * cell_h
                },
            };
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Image width this partition was built for
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height this partition was built for
    pub fn height(&self) -> usize {
        self.height
    }

    /// All leads in canonical order
    pub fn leads(&self) -> &'static [Lead; Lead::COUNT] {
        &Lead::ALL
    }

    /// Map a pixel coordinate to its lead
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidCoordinate` if `(x, y)` lies outside
    /// the image bounds.
    pub fn locate(&self, x: usize, y: usize) -> Result<Lead, AnalysisError> {
        if x >= self.width || y >= self.height {
            return Err(AnalysisError::InvalidCoordinate {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }

        let cell_w = self.width / GRID_COLS;
        let cell_h = self.height / GRID_ROWS;
        let col = (x / cell_w).min(GRID_COLS - 1);
        let row = (y / cell_h).min(GRID_ROWS - 1);

        for lead in Lead::ALL {
            if lead.grid_position() == (row, col) {
                return Ok(lead);
            }
        }
        unreachable!("every grid position is claimed by exactly one lead")
    }

    /// Pixel cell of a lead
    pub fn cell(&self, lead: Lead) -> LeadCell {
        self.cells[lead.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_matches_index() {
        for (i, lead) in Lead::ALL.iter().enumerate() {
            assert_eq!(lead.index(), i);
        }
    }

    #[test]
    fn test_lead_names() {
        assert_eq!(Lead::I.name(), "I");
        assert_eq!(Lead::AVR.name(), "aVR");
        assert_eq!(Lead::V6.name(), "V6");
    }

    #[test]
    fn test_territories() {
        assert_eq!(Lead::II.territory(), Territory::Inferior);
        assert_eq!(Lead::V2.territory(), Territory::Septal);
        assert_eq!(Lead::V4.territory(), Territory::Anterior);
        assert_eq!(Lead::V6.territory(), Territory::Lateral);
        assert_eq!(Lead::AVR.territory(), Territory::Global);
    }

    #[test]
    fn test_partition_is_total() {
        // Every pixel maps to exactly one lead, including remainder rows/cols
        let mapper = LeadMapper::new(14, 14).unwrap();
        let mut counts = [0usize; Lead::COUNT];
        for y in 0..14 {
            for x in 0..14 {
                let lead = mapper.locate(x, y).unwrap();
                counts[lead.index()] += 1;
            }
        }
        assert_eq!(counts.iter().sum::<usize>(), 14 * 14);
        for (i, count) in counts.iter().enumerate() {
            assert!(*count > 0, "lead {} has an empty cell", Lead::ALL[i]);
        }
    }

    #[test]
    fn test_cells_match_locate() {
        let mapper = LeadMapper::new(224, 224).unwrap();
        for lead in Lead::ALL {
            let cell = mapper.cell(lead);
            assert_eq!(mapper.locate(cell.x0, cell.y0).unwrap(), lead);
            assert_eq!(mapper.locate(cell.x1 - 1, cell.y1 - 1).unwrap(), lead);
        }
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mapper = LeadMapper::new(224, 224).unwrap();
        assert!(matches!(
            mapper.locate(224, 0),
            Err(AnalysisError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            mapper.locate(0, 500),
            Err(AnalysisError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_too_small_image_rejected() {
        assert!(LeadMapper::new(2, 2).is_err());
    }

    #[test]
    fn test_v2_cell_position() {
        // V2 sits at row 1, col 2 of the printout layout
        let mapper = LeadMapper::new(224, 224).unwrap();
        let cell = mapper.cell(Lead::V2);
        assert_eq!(cell.x0, 112);
        assert_eq!(cell.y0, 74);
    }
}
