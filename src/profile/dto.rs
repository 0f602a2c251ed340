use serde::Deserialize;

use crate::auth::repo_types::ProfileChanges;
use crate::validation::non_blank;

/// Partial profile update; absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub occupation: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(r: UpdateProfileRequest) -> Self {
        Self {
            // Required columns: blank means "leave unchanged", validation rejects it first.
            first_name: non_blank(r.first_name),
            last_name: non_blank(r.last_name),
            // Optional columns: blank clears.
            bio: trimmed(r.bio),
            location: trimmed(r.location),
            occupation: trimmed(r.occupation),
            website: trimmed(r.website),
            avatar_url: trimmed(r.avatar_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_optional_text_is_kept_so_it_clears() {
        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"bio":"  ","website":"","firstName":" Ann "}"#).unwrap();
        let changes = ProfileChanges::from(req);
        assert_eq!(changes.bio.as_deref(), Some(""));
        assert_eq!(changes.website.as_deref(), Some(""));
        assert_eq!(changes.first_name.as_deref(), Some("Ann"));
        assert!(changes.location.is_none());
    }
}
