/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: The standard REST response envelope
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When the envelope shape changes
*/

use serde::{Deserialize, Serialize};

/// `{"success": bool, "message": string, "data": D}` wrapper returned by every
/// REST endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<D> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<D>,
}
