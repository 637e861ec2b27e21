use crate::CasesError;

/// The search endpoint serves at most this many results per page.
pub const MAX_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseQuery {
    pub query: String,
    /// Court id, e.g. `scotus` or `ca9`.
    pub court: Option<String>,
    /// Precedential status; `all` means no filter.
    pub status: Option<String>,
    /// `YYYY-MM-DD`.
    pub filed_after: Option<String>,
    pub filed_before: Option<String>,
    pub limit: u32,
}

impl CaseQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            court: None,
            status: None,
            filed_after: None,
            filed_before: None,
            limit: MAX_PAGE_SIZE,
        }
    }

    pub fn validate(&self) -> Result<(), CasesError> {
        if self.limit > MAX_PAGE_SIZE {
            return Err(CasesError::InvalidQuery(format!(
                "Limit cannot exceed {MAX_PAGE_SIZE} for search API"
            )));
        }
        if self.limit == 0 {
            return Err(CasesError::InvalidQuery("Limit must be at least 1".into()));
        }
        Ok(())
    }

    /// Query-string pairs for `/search/`. Opinions only (`type=o`).
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.query.clone()),
            ("page_size", self.limit.to_string()),
            ("type", "o".to_string()),
        ];
        let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        if let Some(court) = present(&self.court) {
            params.push(("court", court));
        }
        if let Some(status) = present(&self.status)
            && !status.eq_ignore_ascii_case("all")
        {
            params.push(("status", status));
        }
        if let Some(after) = present(&self.filed_after) {
            params.push(("filed_after", after));
        }
        if let Some(before) = present(&self.filed_before) {
            params.push(("filed_before", before));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_bounds() {
        let mut query = CaseQuery::new("negligence");
        assert!(query.validate().is_ok());
        query.limit = 21;
        assert_eq!(
            query.validate().unwrap_err().to_string(),
            "Limit cannot exceed 20 for search API"
        );
        query.limit = 0;
        assert!(query.validate().is_err());
    }

    #[test]
    fn status_all_is_dropped() {
        let mut query = CaseQuery::new("Palsgraf");
        query.status = Some("all".into());
        query.court = Some("ny".into());
        query.filed_after = Some("1920-01-01".into());
        let params = query.params();
        assert!(params.contains(&("type", "o".to_string())));
        assert!(params.contains(&("court", "ny".to_string())));
        assert!(params.contains(&("filed_after", "1920-01-01".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "status"));
    }

    #[test]
    fn blank_filters_are_omitted() {
        let mut query = CaseQuery::new("consideration");
        query.court = Some("  ".into());
        query.status = Some("Published".into());
        let keys: Vec<&str> = query.params().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["q", "page_size", "type", "status"]);
    }
}
