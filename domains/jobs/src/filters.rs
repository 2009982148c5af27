//! Dynamic filter for `list_by_filters`.

use crate::method::MethodType;
use crate::state::JobStatus;

#[derive(Debug, Clone, Default)]
pub struct JobFilters {
    pub owner: Option<String>,
    pub alignment_id: Option<String>,
    pub tree_id: Option<String>,
    pub method_type: Option<MethodType>,
    pub status: Option<JobStatus>,
    pub limit: Option<i64>,
}
