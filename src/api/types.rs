//! Wire types for Memo API responses. The profile payload keeps unknown
//! fields in a flattened map so server-side additions survive a round trip
//! without a client release.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{data: ...}` envelope the profile endpoint wraps its payload in.
#[derive(Clone, Debug, Deserialize)]
pub struct ProfileEnvelope {
    pub data: ProfilePayload,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePayload {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub department: Option<NamedRef>,
    #[serde(default)]
    pub rank: Option<NamedRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{name}` reference object used for department and rank.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}
