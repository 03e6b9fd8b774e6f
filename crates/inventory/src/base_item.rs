use serde::{Deserialize, Serialize};

/// Global catalogue entry that organization items map onto via `partner_key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseItem {
    pub partner_key: String,
    pub name: String,
    pub category: String,
}

impl BaseItem {
    /// Partner key used for items that stand for a kit.
    pub const KIT_PARTNER_KEY: &'static str = "kit";

    pub fn new(partner_key: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            partner_key: partner_key.into(),
            name: name.into(),
            category: category.into(),
        }
    }

    pub fn kit() -> Self {
        Self::new(Self::KIT_PARTNER_KEY, "Kit", "kit")
    }

    /// Default catalogue loaded into fresh stores.
    pub fn seed_catalog() -> Vec<BaseItem> {
        vec![
            Self::kit(),
            Self::new("adult_incontinence", "Adult Incontinence Pads", "Adult Incontinence"),
            Self::new("adult_lxl", "Adult Briefs (Large/X-Large)", "Adult Incontinence"),
            Self::new("k_newborn", "Kids (Newborn)", "Diapers - Childrens"),
            Self::new("k_size1", "Kids (Size 1)", "Diapers - Childrens"),
            Self::new("k_size2", "Kids (Size 2)", "Diapers - Childrens"),
            Self::new("wipes", "Baby Wipes", "Miscellaneous"),
            Self::new("pads", "Menstrual Pads", "Menstrual Supplies/Items"),
        ]
    }
}
