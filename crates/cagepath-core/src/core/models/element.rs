use phf::{Map, phf_map};

/// Default radius and valence-shell information for an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementDefaults {
    /// Van der Waals radius in Angstroms.
    pub radius: f64,
    /// Typical number of bonded ligands.
    pub ligands: u8,
    /// Typical number of lone pairs.
    pub lone_pairs: u8,
}

const fn defaults(radius: f64, ligands: u8, lone_pairs: u8) -> ElementDefaults {
    ElementDefaults {
        radius,
        ligands,
        lone_pairs,
    }
}

static ELEMENT_DEFAULTS: Map<&'static str, ElementDefaults> = phf_map! {
    "H" => defaults(1.20, 1, 0),
    "B" => defaults(1.92, 3, 0),
    "C" => defaults(1.70, 4, 0),
    "N" => defaults(1.55, 3, 1),
    "O" => defaults(1.52, 2, 2),
    "F" => defaults(1.47, 1, 3),
    "SI" => defaults(2.10, 4, 0),
    "P" => defaults(1.80, 3, 1),
    "S" => defaults(1.80, 2, 2),
    "CL" => defaults(1.75, 1, 3),
    "BR" => defaults(1.85, 1, 3),
    "I" => defaults(1.98, 1, 3),
};

/// Radius used for symbols missing from the table.
pub const FALLBACK_RADIUS: f64 = 1.80;

/// Looks up the defaults for an element symbol, ignoring case and surrounding whitespace.
pub fn element_defaults(symbol: &str) -> Option<ElementDefaults> {
    ELEMENT_DEFAULTS
        .get(symbol.trim().to_ascii_uppercase().as_str())
        .copied()
}

/// Van der Waals radius for `symbol`, or [`FALLBACK_RADIUS`] when the element is unknown.
pub fn default_radius(symbol: &str) -> f64 {
    element_defaults(symbol).map_or(FALLBACK_RADIUS, |d| d.radius)
}
