//! Assembled chart view returned to callers.

use serde::{Deserialize, Serialize};

use super::condition::ToothCondition;
use super::procedure::ToothProcedure;
use super::tooth::Tooth;

/// A registry tooth populated with its current chart entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartTooth {
    #[serde(flatten)]
    pub tooth: Tooth,
    pub conditions: Vec<ToothCondition>,
    pub procedures: Vec<ToothProcedure>,
}

impl ChartTooth {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.procedures.is_empty()
    }
}

/// A patient's full dental chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DentalChart {
    pub patient_id: String,
    pub patient_name: String,
    /// Timestamp of the latest history entry, if any
    pub last_updated: Option<String>,
    /// Teeth 1-32 in registry order
    pub permanent_teeth: Vec<ChartTooth>,
    /// Teeth A-T in registry order
    pub primary_teeth: Vec<ChartTooth>,
    /// Procedures not tied to a tooth
    pub general_procedures: Vec<ToothProcedure>,
}

impl DentalChart {
    /// Find a tooth by identity in either dentition.
    pub fn tooth(&self, number: &str) -> Option<&ChartTooth> {
        self.permanent_teeth
            .iter()
            .chain(self.primary_teeth.iter())
            .find(|t| t.tooth.number == number)
    }

    /// All tooth-bound procedures across both dentitions.
    pub fn procedures(&self) -> impl Iterator<Item = (&ChartTooth, &ToothProcedure)> {
        self.permanent_teeth
            .iter()
            .chain(self.primary_teeth.iter())
            .flat_map(|t| t.procedures.iter().map(move |p| (t, p)))
    }
}
