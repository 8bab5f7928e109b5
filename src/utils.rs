/// Shared utility functions for the climate trends service
///
/// Normalize a user-supplied station identifier to its catalogue slug
///
/// Station IDs are lowercase ASCII slugs such as "sheffield" or "rossonwye".
/// Identifiers arriving from configuration or query strings are trimmed and
/// lowercased before use.
///
/// # Examples
///
/// ```
/// use climate_trends_service::utils::normalize_station_id;
///
/// assert_eq!(normalize_station_id("Sheffield").unwrap(), "sheffield");
/// assert_eq!(normalize_station_id("  oxford ").unwrap(), "oxford");
/// assert!(normalize_station_id("ross-on-wye").is_err());
/// ```
pub fn normalize_station_id(value: &str) -> Result<String, &'static str> {
    let slug = value.trim().to_ascii_lowercase();

    if slug.is_empty() {
        return Err("Station ID is empty");
    }

    if !slug.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Station ID must be ASCII letters and digits only");
    }

    Ok(slug)
}

/// Parse a comma-separated station list, skipping empty entries
///
/// ```
/// use climate_trends_service::utils::parse_station_list;
///
/// assert_eq!(parse_station_list("Oxford, sheffield,,").unwrap(), vec!["oxford", "sheffield"]);
/// assert!(parse_station_list("").unwrap().is_empty());
/// ```
pub fn parse_station_list(value: &str) -> Result<Vec<String>, &'static str> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(normalize_station_id)
        .collect()
}
