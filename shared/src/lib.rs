use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumCount, EnumIter, IntoStaticStr};

/// Skin lesion categories, declared in the order of the classifier's output units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumCount, EnumIter, IntoStaticStr,
)]
pub enum LesionClass {
    #[strum(serialize = "Actinic Keratoses (akiec)")]
    ActinicKeratoses,
    #[strum(serialize = "Basal Cell Carcinoma (bcc)")]
    BasalCellCarcinoma,
    #[strum(serialize = "Benign Keratosis-like Lesions (bkl)")]
    BenignKeratosis,
    #[strum(serialize = "Dermatofibroma (df)")]
    Dermatofibroma,
    #[strum(serialize = "Melanoma (mel)")]
    Melanoma,
    #[strum(serialize = "Melanocytic Nevi (nv)")]
    MelanocyticNevi,
    #[strum(serialize = "Vascular Lesions (vasc)")]
    VascularLesions,
}

impl LesionClass {
    pub const COUNT: usize = <Self as strum::EnumCount>::COUNT;

    pub fn from_index(index: usize) -> Option<Self> {
        Self::iter().nth(index)
    }

    pub fn label(self) -> &'static str {
        self.into()
    }

    pub fn labels() -> Vec<&'static str> {
        Self::iter().map(Self::label).collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionResponse {
    pub prediction: String,
    pub confidence: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
