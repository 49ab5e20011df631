use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::storage::Record;

/// Tag carried by every payslip line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCategory {
    #[default]
    #[serde(alias = "IMPONIBLE")]
    Imponible,
    #[serde(alias = "NO_IMPONIBLE")]
    NoImponible,
    #[serde(alias = "PREVISIONAL")]
    Previsional,
    #[serde(alias = "NO_PREVISIONAL")]
    NoPrevisional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "concepto")]
    pub concept: String,
    #[serde(rename = "monto")]
    pub amount: f64,
    #[serde(rename = "tipo", default)]
    pub category: LineCategory,
}

impl LineItem {
    pub fn new(concept: impl Into<String>, amount: f64, category: LineCategory) -> Self {
        Self { concept: concept.into(), amount, category }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayslipStatus {
    #[default]
    #[serde(rename = "borrador", alias = "Borrador")]
    Draft,
    #[serde(rename = "final", alias = "Final")]
    Final,
}

impl PayslipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayslipStatus::Draft => "borrador",
            PayslipStatus::Final => "final",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PayslipTotals {
    pub earnings: f64,
    pub deductions: f64,
    pub net: f64,
}

impl PayslipTotals {
    /// Flat reduction: no proration, no rounding.
    pub fn compute(earnings: &[LineItem], deductions: &[LineItem]) -> Self {
        let earnings: f64 = earnings.iter().map(|i| i.amount).sum();
        let deductions: f64 = deductions.iter().map(|i| i.amount).sum();
        Self { earnings, deductions, net: earnings - deductions }
    }
}

/// A "liquidación": one employee's earnings, deductions and net pay for a period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payslip {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "empleado")]
    pub employee_id: String,
    #[serde(rename = "periodo")]
    pub period: String,
    #[serde(rename = "fechaPago", default, with = "crate::dates::iso_date_opt")]
    pub payment_date: Option<Date>,
    #[serde(rename = "diasTrabajados", default)]
    pub worked_days: u8,
    #[serde(rename = "haberes", default)]
    pub earnings: Vec<LineItem>,
    #[serde(rename = "descuentos", default)]
    pub deductions: Vec<LineItem>,
    #[serde(rename = "totalHaberes", default)]
    pub total_earnings: f64,
    #[serde(rename = "totalDescuentos", default)]
    pub total_deductions: f64,
    #[serde(rename = "liquido", default)]
    pub net: f64,
    #[serde(rename = "estado", default)]
    pub status: PayslipStatus,
    #[serde(rename = "fechaCreacion", default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(rename = "fechaActualizacion", default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl Payslip {
    pub fn totals(&self) -> PayslipTotals {
        PayslipTotals::compute(&self.earnings, &self.deductions)
    }

    pub fn recompute_totals(&mut self) {
        let t = self.totals();
        self.total_earnings = t.earnings;
        self.total_deductions = t.deductions;
        self.net = t.net;
    }
}

impl Record for Payslip {
    type Id = i64;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

/// Renders an amount the way `es-CL` formats CLP: `$1.500.000`, `-$2.700,50`.
pub fn format_currency(amount: f64, decimals: usize) -> String {
    let factor = 10f64.powi(decimals as i32);
    let scaled = (amount.abs() * factor).round() as u128;
    let int_part = scaled / factor as u128;
    let frac_part = scaled % factor as u128;

    let digits = int_part.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && scaled > 0 { "-" } else { "" };
    if decimals == 0 {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}${grouped},{frac_part:0width$}", width = decimals)
    }
}
