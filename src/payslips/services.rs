use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::repo_types::{LineCategory, LineItem, Payslip, PayslipStatus};
use crate::concepts::ConceptBook;
use crate::employees::Employee;
use crate::error::{ServiceError, ServiceResult};
use crate::storage::documents::PayslipFilter;
use crate::storage::{PayslipRepo, Repository};

lazy_static! {
    static ref PERIOD_RE: Regex = Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").unwrap();
}

pub const MAX_WORKED_DAYS: u8 = 31;

pub fn is_valid_period(period: &str) -> bool {
    PERIOD_RE.is_match(period)
}

fn check_lines(lines: &[LineItem]) -> bool {
    lines.iter().all(|l| l.amount.is_finite() && l.amount >= 0.0)
}

/// Finite lines can still add up to infinity.
fn check_totals(p: &Payslip) -> ServiceResult<()> {
    if [p.total_earnings, p.total_deductions, p.net].iter().all(|t| t.is_finite()) {
        Ok(())
    } else {
        Err(ServiceError::validation("Los montos exceden el máximo permitido"))
    }
}

pub struct PayslipService {
    repo: PayslipRepo,
    employees: Arc<dyn Repository<Employee>>,
}

impl PayslipService {
    pub fn new(repo: PayslipRepo, employees: Arc<dyn Repository<Employee>>) -> Self {
        Self { repo, employees }
    }

    pub async fn list(&self, filter: &PayslipFilter) -> ServiceResult<Vec<Payslip>> {
        Ok(self.repo.list_filtered(filter).await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Payslip> {
        self.repo
            .get_by_id(&id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Liquidación no encontrada"))
    }

    pub async fn validate(&self, p: &Payslip) -> ServiceResult<()> {
        if p.employee_id.trim().is_empty()
            || self.employees.get_by_id(&p.employee_id).await?.is_none()
        {
            return Err(ServiceError::validation("El empleado seleccionado no existe"));
        }
        if !is_valid_period(&p.period) {
            return Err(ServiceError::validation("El período debe tener el formato AAAA-MM"));
        }
        if p.worked_days > MAX_WORKED_DAYS {
            return Err(ServiceError::validation(format!(
                "Los días trabajados deben estar entre 0 y {MAX_WORKED_DAYS}"
            )));
        }
        if !check_lines(&p.earnings) || !check_lines(&p.deductions) {
            return Err(ServiceError::validation("Los montos no pueden ser negativos"));
        }
        Ok(())
    }

    /// Inserts or replaces; totals are always recomputed from the line items.
    #[instrument(skip(self, payslip), fields(empleado = %payslip.employee_id, periodo = %payslip.period))]
    pub async fn save(&self, mut payslip: Payslip) -> ServiceResult<Payslip> {
        self.validate(&payslip).await?;
        payslip.recompute_totals();
        check_totals(&payslip)?;

        let now = OffsetDateTime::now_utc();
        let previous = match payslip.id {
            Some(id) => self.repo.get_by_id(&id).await?,
            None => None,
        };
        payslip.created_at = previous
            .and_then(|p| p.created_at)
            .or(payslip.created_at)
            .or(Some(now));
        payslip.updated_at = Some(now);

        let saved = self.repo.put(payslip).await?;
        info!(id = ?saved.id, liquido = saved.net, "payslip saved");
        Ok(saved)
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        if !self.repo.hard_delete(&id).await? {
            return Err(ServiceError::not_found("Liquidación no encontrada"));
        }
        info!(id, "payslip deleted");
        Ok(())
    }

    /// Unsaved draft for an employee: base salary plus every concept that yields an amount.
    /// Rate deductions apply over the taxable earnings.
    pub async fn draft(&self, employee_id: &str, period: &str, book: &ConceptBook) -> ServiceResult<Payslip> {
        let employee = self
            .employees
            .get_by_id(&employee_id.to_string())
            .await?
            .ok_or_else(|| ServiceError::validation("El empleado seleccionado no existe"))?;
        if !is_valid_period(period) {
            return Err(ServiceError::validation("El período debe tener el formato AAAA-MM"));
        }

        let base = employee.sueldo_base;
        let mut earnings = vec![LineItem::new("Sueldo Base", base, LineCategory::Imponible)];
        earnings.extend(
            book.earnings
                .iter()
                .map(|c| c.line_item(base))
                .filter(|l| l.amount > 0.0),
        );
        let taxable: f64 = earnings
            .iter()
            .filter(|l| l.category == LineCategory::Imponible)
            .map(|l| l.amount)
            .sum();
        let deductions = book
            .deductions
            .iter()
            .map(|c| c.line_item(taxable))
            .filter(|l| l.amount > 0.0)
            .collect();

        let mut p = Payslip {
            employee_id: employee_id.to_string(),
            period: period.to_string(),
            worked_days: 30,
            earnings,
            deductions,
            status: PayslipStatus::Draft,
            ..Default::default()
        };
        p.recompute_totals();
        check_totals(&p)?;
        Ok(p)
    }
}
