//! Treatment summary derived from a chart.

use serde::Serialize;

use crate::models::{DentalChart, Price, ProcedureStatus, ToothProcedure};

use super::escape_csv;

/// Count and price total for one procedure status.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StatusTotal {
    pub count: usize,
    pub total: Price,
}

impl StatusTotal {
    fn record(&mut self, price: Option<Price>) {
        self.count += 1;
        self.total = self.total.saturating_add(price.unwrap_or(Price::ZERO));
    }
}

/// Totals by status.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StatusTotals {
    pub planned: StatusTotal,
    pub in_progress: StatusTotal,
    pub completed: StatusTotal,
    pub cancelled: StatusTotal,
}

impl StatusTotals {
    pub fn get(&self, status: ProcedureStatus) -> &StatusTotal {
        match status {
            ProcedureStatus::Planned => &self.planned,
            ProcedureStatus::InProgress => &self.in_progress,
            ProcedureStatus::Completed => &self.completed,
            ProcedureStatus::Cancelled => &self.cancelled,
        }
    }

    fn get_mut(&mut self, status: ProcedureStatus) -> &mut StatusTotal {
        match status {
            ProcedureStatus::Planned => &mut self.planned,
            ProcedureStatus::InProgress => &mut self.in_progress,
            ProcedureStatus::Completed => &mut self.completed,
            ProcedureStatus::Cancelled => &mut self.cancelled,
        }
    }
}

/// One procedure row in a summary.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryLine {
    pub procedure_id: String,
    /// `None` for general procedures
    pub tooth_number: Option<String>,
    pub tooth_name: Option<String>,
    pub procedure_code: String,
    pub procedure_name: String,
    pub surface: String,
    pub status: ProcedureStatus,
    pub price: Option<Price>,
    pub date_performed: String,
    #[serde(skip)]
    created_at: String,
}

impl SummaryLine {
    fn new(procedure: &ToothProcedure, tooth_name: Option<&str>) -> Self {
        Self {
            procedure_id: procedure.id.clone(),
            tooth_number: procedure.tooth_number.clone(),
            tooth_name: tooth_name.map(String::from),
            procedure_code: procedure.reference.code().to_string(),
            procedure_name: procedure.reference.name().to_string(),
            surface: procedure.surfaces.to_wire(),
            status: procedure.status,
            price: procedure.price,
            date_performed: procedure.date_performed.clone(),
            created_at: procedure.created_at.clone(),
        }
    }
}

/// Financial and status view over every procedure on a chart.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TreatmentSummary {
    pub patient_id: String,
    pub patient_name: String,
    pub generated_at: String,
    pub totals: StatusTotals,
    /// Planned plus in-progress value
    pub outstanding: Price,
    /// Newest first
    pub procedures: Vec<SummaryLine>,
}

impl TreatmentSummary {
    pub fn from_chart(chart: &DentalChart) -> Self {
        let mut procedures: Vec<SummaryLine> = chart
            .procedures()
            .map(|(tooth, p)| SummaryLine::new(p, Some(&tooth.tooth.name)))
            .chain(chart.general_procedures.iter().map(|p| SummaryLine::new(p, None)))
            .collect();
        procedures.sort_by(|a, b| {
            b.date_performed
                .cmp(&a.date_performed)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        let mut totals = StatusTotals::default();
        for line in &procedures {
            totals.get_mut(line.status).record(line.price);
        }
        let outstanding = totals.planned.total.saturating_add(totals.in_progress.total);

        Self {
            patient_id: chart.patient_id.clone(),
            patient_name: chart.patient_name.clone(),
            generated_at: crate::models::now_timestamp(),
            totals,
            outstanding,
            procedures,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// One row per procedure.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("patient_id,procedure_id,tooth_number,tooth_name,procedure_code,procedure_name,surface,status,price,date_performed\n");

        for line in &self.procedures {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{}\n",
                escape_csv(&self.patient_id),
                escape_csv(&line.procedure_id),
                line.tooth_number.as_deref().unwrap_or(""),
                escape_csv(line.tooth_name.as_deref().unwrap_or("")),
                escape_csv(&line.procedure_code),
                escape_csv(&line.procedure_name),
                escape_csv(&line.surface),
                line.status.as_str(),
                line.price.map(|p| p.to_string()).unwrap_or_default(),
                escape_csv(&line.date_performed),
            ));
        }

        csv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChartTooth, EntryReference, SurfaceSet};
    use crate::registry::ToothRegistry;

    fn make_procedure(tooth: Option<&str>, status: ProcedureStatus, price: &str, date: &str) -> ToothProcedure {
        ToothProcedure {
            id: format!("proc-{}-{}", tooth.unwrap_or("general"), date),
            patient_id: "patient-1".into(),
            tooth_number: tooth.map(String::from),
            reference: EntryReference::Catalog {
                catalog_id: 3,
                name: "Composite Filling (2 surfaces)".into(),
                code: "D2331".into(),
            },
            surfaces: SurfaceSet::parse("mesial,occlusal").unwrap(),
            status,
            price: Price::parse(price),
            date_performed: date.into(),
            performed_by: None,
            notes: None,
            progress_notes: Vec::new(),
            created_at: format!("{date}T09:00:00.000000Z"),
            updated_at: None,
        }
    }

    fn make_chart() -> DentalChart {
        let mut permanent_teeth: Vec<ChartTooth> = ToothRegistry::teeth_for(crate::models::DentitionType::Permanent)
            .into_iter()
            .map(|tooth| ChartTooth {
                tooth,
                conditions: Vec::new(),
                procedures: Vec::new(),
            })
            .collect();
        permanent_teeth[13].procedures = vec![
            make_procedure(Some("14"), ProcedureStatus::Planned, "180.00", "2024-03-01"),
            make_procedure(Some("14"), ProcedureStatus::Completed, "120.00", "2024-01-10"),
        ];
        permanent_teeth[2].procedures = vec![make_procedure(Some("3"), ProcedureStatus::InProgress, "700", "2024-02-15")];

        DentalChart {
            patient_id: "patient-1".into(),
            patient_name: "Jane Doe".into(),
            last_updated: None,
            permanent_teeth,
            primary_teeth: Vec::new(),
            general_procedures: vec![make_procedure(None, ProcedureStatus::Cancelled, "95", "2024-04-01")],
        }
    }

    #[test]
    fn test_totals_by_status() {
        let summary = TreatmentSummary::from_chart(&make_chart());

        assert_eq!(summary.totals.planned.count, 1);
        assert_eq!(summary.totals.get(ProcedureStatus::Completed).total.cents(), 12000);
        assert_eq!(summary.totals.cancelled.count, 1);
        assert_eq!(summary.outstanding.to_string(), "880.00");
    }

    #[test]
    fn test_procedures_newest_first() {
        let summary = TreatmentSummary::from_chart(&make_chart());
        let dates: Vec<&str> = summary.procedures.iter().map(|l| l.date_performed.as_str()).collect();
        assert_eq!(dates, ["2024-04-01", "2024-03-01", "2024-02-15", "2024-01-10"]);
        assert_eq!(summary.procedures[0].tooth_number, None);
        assert_eq!(summary.procedures[1].tooth_name.as_deref(), Some("Upper Left First Molar"));
    }

    #[test]
    fn test_summary_csv() {
        let summary = TreatmentSummary::from_chart(&make_chart());
        let csv = summary.to_csv();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 5); // Header + 4 procedures
        assert!(lines[0].starts_with("patient_id,procedure_id"));
        assert!(lines[1].contains(",cancelled,95.00,"));
        // Surface list is quoted
        assert!(lines[2].contains("\"mesial,occlusal\""));
    }

    #[test]
    fn test_summary_json() {
        let summary = TreatmentSummary::from_chart(&make_chart());
        let json = summary.to_json().unwrap();
        assert!(json.contains("\"outstanding\": \"880.00\""));
        assert!(!json.contains("created_at"));
    }
}
