use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::concepts::ConceptBook;
use crate::employees::{Employee, EmployeeStatus};
use crate::payslips::Payslip;
use crate::settings::Configuration;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTotals {
    pub liquidaciones: usize,
    pub total_haberes: f64,
    pub total_descuentos: f64,
    pub total_liquido: f64,
}

/// Aggregates shown by the reports view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub empleados: usize,
    pub empleados_activos: usize,
    pub liquidaciones: usize,
    pub total_haberes: f64,
    pub total_descuentos: f64,
    pub total_liquido: f64,
    pub por_periodo: BTreeMap<String, PeriodTotals>,
}

impl ReportSummary {
    pub fn build(employees: &[Employee], payslips: &[Payslip]) -> Self {
        let mut summary = Self {
            empleados: employees.len(),
            empleados_activos: employees
                .iter()
                .filter(|e| e.estado == EmployeeStatus::Active)
                .count(),
            liquidaciones: payslips.len(),
            ..Default::default()
        };
        for p in payslips {
            summary.total_haberes += p.total_earnings;
            summary.total_descuentos += p.total_deductions;
            summary.total_liquido += p.net;

            let period = summary.por_periodo.entry(p.period.clone()).or_default();
            period.liquidaciones += 1;
            period.total_haberes += p.total_earnings;
            period.total_descuentos += p.total_deductions;
            period.total_liquido += p.net;
        }
        summary
    }
}

/// Everything the UI shell renders from. Never mutated in place once published.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub current_view: String,
    pub active_link: Option<String>,
    pub title: String,
    /// Markup currently swapped into the main container.
    pub content: String,
    pub employees: Vec<Employee>,
    pub payslips: Vec<Payslip>,
    pub concepts: ConceptBook,
    pub configuration: Option<Configuration>,
    pub reports: Option<ReportSummary>,
}

pub struct AppStore {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Snapshot::default()));
        Self { tx }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }

    /// Publishes a new snapshot derived from the current one and notifies subscribers.
    pub fn update(&self, f: impl FnOnce(&mut Snapshot)) {
        self.tx.send_modify(|current| {
            let mut next = Snapshot::clone(current);
            f(&mut next);
            *current = Arc::new(next);
        });
    }
}
