use serde::{Deserialize, Serialize};

use crate::payslips::repo_types::{LineCategory, LineItem};
use crate::storage::{flexible_id, Record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConceptKind {
    #[default]
    Haber,
    Descuento,
}

/// A payroll concept: a fixed amount, or a rate over the base when `0 < valor < 1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    #[serde(default, deserialize_with = "flexible_id::deserialize", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub codigo: String,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub tipo: ConceptKind,
    #[serde(default)]
    pub imponible: bool,
    #[serde(default)]
    pub tributable: bool,
    #[serde(default)]
    pub valor: f64,
}

impl Concept {
    pub fn is_rate(&self) -> bool {
        self.valor > 0.0 && self.valor < 1.0
    }

    pub fn amount_for(&self, base: f64) -> f64 {
        if self.is_rate() {
            (self.valor * base).round()
        } else {
            self.valor
        }
    }

    /// Earnings are tagged by taxability; rate deductions are treated as statutory contributions.
    pub fn line_item(&self, base: f64) -> LineItem {
        let category = match (self.tipo, self.imponible, self.is_rate()) {
            (ConceptKind::Haber, true, _) => LineCategory::Imponible,
            (ConceptKind::Haber, false, _) => LineCategory::NoImponible,
            (ConceptKind::Descuento, _, true) => LineCategory::Previsional,
            (ConceptKind::Descuento, _, false) => LineCategory::NoPrevisional,
        };
        LineItem::new(self.nombre.clone(), self.amount_for(base), category)
    }
}

impl Record for Concept {
    type Id = String;

    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

/// Concepts split by kind, in stored order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConceptBook {
    #[serde(rename = "haberes")]
    pub earnings: Vec<Concept>,
    #[serde(rename = "descuentos")]
    pub deductions: Vec<Concept>,
}

impl ConceptBook {
    pub fn from_concepts(concepts: impl IntoIterator<Item = Concept>) -> Self {
        let (earnings, deductions) = concepts
            .into_iter()
            .partition(|c| c.tipo == ConceptKind::Haber);
        Self { earnings, deductions }
    }
}
