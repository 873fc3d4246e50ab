use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;

use placementlog_db::PlacementStore;
use placementlog_db::models::NewPlacement;
use placementlog_types::api::{PlacementCreatedResponse, PlacementRequest};
use placementlog_types::models::{BranchCount, BranchTotal, CompanyTotal, PlacementEvent};

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthContext;
use crate::response::respond;
use crate::state::{AppState, run_blocking};

/// Branch code of a registration number: bytes 2..5, lowercased.
/// Anything too short to hold one yields an empty string.
pub fn branch_from_reg_no(reg_no: &str) -> String {
    reg_no
        .get(2..5)
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Tallies students per branch, sorted by branch code. Entries without a
/// branch are skipped.
pub fn count_branches<S: AsRef<str>>(students: &[S]) -> Vec<BranchCount> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for student in students {
        let branch = branch_from_reg_no(student.as_ref());
        if branch.is_empty() {
            continue;
        }
        *counts.entry(branch).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(branch, count)| BranchCount { branch, count })
        .collect()
}

pub struct PlacementService {
    store: Arc<dyn PlacementStore>,
}

impl PlacementService {
    pub fn new(store: Arc<dyn PlacementStore>) -> Self {
        Self { store }
    }

    pub fn add_placement(&self, req: PlacementRequest) -> ApiResult<PlacementEvent> {
        let company = req.company.trim();
        if company.is_empty() {
            return Err(ApiError::Validation("company is required".into()));
        }
        if !req.ctc.is_finite() || req.ctc < 0.0 {
            return Err(ApiError::Validation(
                "ctc must be a non-negative number".into(),
            ));
        }

        let placement = NewPlacement {
            company: company.to_string(),
            ctc: req.ctc,
            placement_date: req
                .placement_date
                .unwrap_or_else(|| Utc::now().date_naive()),
            branch_counts: count_branches(req.students.as_slice()),
        };

        let event = self.store.insert_placement(&placement)?;
        info!(
            placement_id = event.id,
            company = %event.company,
            students = req.students.len(),
            "Placement recorded"
        );
        Ok(event)
    }

    pub fn list_all(&self) -> ApiResult<Vec<PlacementEvent>> {
        Ok(self.store.placements()?)
    }

    /// company -> [(branch, total)]
    pub fn company_branch_map(&self) -> ApiResult<BTreeMap<String, Vec<BranchTotal>>> {
        let mut map: BTreeMap<String, Vec<BranchTotal>> = BTreeMap::new();
        for row in self.store.company_branch_totals()? {
            map.entry(row.company).or_default().push(BranchTotal {
                branch: row.branch,
                total: row.total,
            });
        }
        Ok(map)
    }

    /// branch -> [(company, total)]
    pub fn branch_company_map(&self) -> ApiResult<BTreeMap<String, Vec<CompanyTotal>>> {
        let mut map: BTreeMap<String, Vec<CompanyTotal>> = BTreeMap::new();
        for row in self.store.branch_company_totals()? {
            map.entry(row.branch).or_default().push(CompanyTotal {
                company: row.company,
                total: row.total,
            });
        }
        Ok(map)
    }
}

// -- Handlers --

/// GET /placements
pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let events = run_blocking(move || state.placements.list_all()).await?;
    Ok(respond(StatusCode::OK, events))
}

/// GET /placements/company-branch
pub async fn company_branch(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let map = run_blocking(move || state.placements.company_branch_map()).await?;
    Ok(respond(StatusCode::OK, map))
}

/// GET /placements/branch-company
pub async fn branch_company(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let map = run_blocking(move || state.placements.branch_company_map()).await?;
    Ok(respond(StatusCode::OK, map))
}

/// POST /admin/placements
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    payload: Result<Json<PlacementRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let event = run_blocking(move || state.placements.add_placement(req)).await?;

    info!(admin_id = %ctx.subject, placement_id = event.id, "Placement added by admin");
    Ok(respond(StatusCode::CREATED, PlacementCreatedResponse::from(event)))
}
