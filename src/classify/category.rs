use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::domain::WasteCategory;

const ORGANIC_LABELS: &[&str] = &[
    "organic",
    "biological",
    "food",
    "food_waste",
    "fruit",
    "vegetable",
    "leaf",
    "leaves",
    "wood",
    "compost",
    "eggshell",
    "bone",
    "organik",
    "sisa_makanan",
    "daun",
];

const HAZARDOUS_LABELS: &[&str] = &[
    "hazardous",
    "battery",
    "batteries",
    "electronic",
    "electronics",
    "e-waste",
    "ewaste",
    "medical",
    "syringe",
    "medicine",
    "chemical",
    "paint",
    "light_bulb",
    "lightbulb",
    "lamp",
    "pesticide",
    "aerosol",
    "b3",
    "baterai",
];

const INORGANIC_LABELS: &[&str] = &[
    "inorganic",
    "plastic",
    "bottle",
    "plastic_bag",
    "glass",
    "metal",
    "can",
    "aluminium",
    "aluminum",
    "paper",
    "cardboard",
    "carton",
    "textile",
    "clothes",
    "shoes",
    "rubber",
    "styrofoam",
    "trash",
    "other",
    "anorganik",
    "plastik",
    "kaca",
    "logam",
    "kertas",
];

static GLOBAL: Lazy<CategoryMap> = Lazy::new(CategoryMap::builtin);

/// Lowercase label to category table. Built once, never mutated.
#[derive(Debug)]
pub struct CategoryMap {
    entries: HashMap<&'static str, WasteCategory>,
}

impl CategoryMap {
    pub fn global() -> &'static CategoryMap {
        &GLOBAL
    }

    fn builtin() -> Self {
        let mut entries = HashMap::new();
        for (labels, category) in [
            (ORGANIC_LABELS, WasteCategory::Organic),
            (HAZARDOUS_LABELS, WasteCategory::Hazardous),
            (INORGANIC_LABELS, WasteCategory::Inorganic),
        ] {
            for label in labels {
                entries.insert(*label, category);
            }
        }
        Self { entries }
    }

    pub fn lookup(&self, label: &str) -> Option<WasteCategory> {
        let key = label.trim().to_lowercase();
        self.entries.get(key.as_str()).copied()
    }

    /// Unmapped labels fall back to [`WasteCategory::Inorganic`].
    pub fn map(&self, label: &str) -> WasteCategory {
        match self.lookup(label) {
            Some(category) => category,
            None => {
                tracing::info!(
                    target: "classify",
                    label,
                    "label not in category table; defaulting to inorganic"
                );
                WasteCategory::Inorganic
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
