//! Search form construction.

/// Content type the upstream AJAX endpoint expects.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Form-encoded body for the search endpoint.
///
/// The query field name embeds the current site version.
pub fn search_form(version: &str, token: &str, query: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("tabla", "resultados")
        .append_pair("filtros", "")
        .append_pair(&format!("buscar{version}"), query)
        .append_pair("token", token)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(body: &str) -> Vec<(String, String)> {
        url::form_urlencoded::parse(body.as_bytes()).into_owned().collect()
    }

    #[test]
    fn test_form_fields() {
        let body = search_form("231", "tok", "Dark S01E01");
        assert_eq!(
            pairs(&body),
            vec![
                ("tabla".to_string(), "resultados".to_string()),
                ("filtros".to_string(), String::new()),
                ("buscar231".to_string(), "Dark S01E01".to_string()),
                ("token".to_string(), "tok".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_is_escaped() {
        let body = search_form("1", "t&k", "Amélie (2001)");
        assert!(body.contains("buscar1=Am%C3%A9lie+%282001%29"));
        assert!(body.contains("token=t%26k"));
    }
}
