//! Paths for the `basicspacedata` query API.
//!
//! Requests are expressed entirely in the path as alternating keys and values, e.g.
//! `/basicspacedata/query/class/tle/NORAD_CAT_ID/25544/limit/1`.

/// NORAD catalog number of the International Space Station.
pub const DEFAULT_NORAD_ID: u32 = 25544;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Query {
    class: String,
    segments: Vec<(String, String)>,
}

impl Query {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            segments: Vec::new(),
        }
    }

    fn segment(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.segments.push((key.into(), value.into()));
        self
    }

    /// Restrict results to those where `field` matches `value`, e.g. `">now-30"`.
    pub fn predicate(self, field: impl Into<String>, value: impl ToString) -> Self {
        self.segment(field, value.to_string())
    }

    pub fn format(self, format: impl Into<String>) -> Self {
        self.segment("format", format)
    }

    /// Sort by one or more fields, e.g. `"EPOCH desc"`.
    pub fn order_by(self, order: impl Into<String>) -> Self {
        self.segment("orderby", order)
    }

    pub fn limit(self, limit: u32) -> Self {
        self.segment("limit", limit.to_string())
    }

    pub fn path(&self) -> String {
        let mut path = format!("/basicspacedata/query/class/{}", urlencoding::encode(&self.class));
        for (key, value) in &self.segments {
            path.push('/');
            path.push_str(&urlencoding::encode(key));
            path.push('/');
            path.push_str(&urlencoding::encode(value));
        }
        path
    }
}

/// The most recent two-line element set for a single object.
pub fn latest_tle(norad_id: u32) -> Query {
    Query::new("tle")
        .format("tle")
        .predicate("NORAD_CAT_ID", norad_id)
        .order_by("EPOCH desc")
        .limit(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_tle_path_matches_api() {
        assert_eq!(
            latest_tle(DEFAULT_NORAD_ID).path(),
            "/basicspacedata/query/class/tle/format/tle/NORAD_CAT_ID/25544/orderby/EPOCH%20desc/limit/1"
        );
    }

    #[test]
    fn latest_tle_interpolates_id() {
        assert!(latest_tle(43013)
            .path()
            .contains("/NORAD_CAT_ID/43013/orderby/EPOCH%20desc/limit/1"));
    }

    #[test]
    fn segments_are_encoded_in_order() {
        let query = Query::new("gp")
            .predicate("EPOCH", ">now-30")
            .predicate("OBJECT_NAME", "STARLINK 1007")
            .format("json");
        assert_eq!(
            query.path(),
            "/basicspacedata/query/class/gp/EPOCH/%3Enow-30/OBJECT_NAME/STARLINK%201007/format/json"
        );
    }
}
