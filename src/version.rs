//! API Version Management
//!
//! Build-time API version reading from Cargo.toml metadata. The version
//! lives in package.metadata.plugforge.api_version so every build of
//! the same source reports the same API version.

// Include the build-generated API version constant
include!(concat!(env!("OUT_DIR"), "/version_api.rs"));

/// Get the current API version
///
/// The version format is YYYYMMDD (e.g. 20250819 = 19 August 2025). To
/// increment it, edit package.metadata.plugforge.api_version in
/// Cargo.toml and rebuild.
pub fn get_api_version() -> i64 {
    BASE_API_VERSION
}

/// Extract the major component (the year) from a YYYYMMDD version
pub fn api_major_version(version: i64) -> i64 {
    version / 10000
}

/// Check whether a plugin's required API version is compatible
///
/// Compatibility is judged on the major (year) component only. Plugins
/// built against any version from the same year as the current API are
/// accepted.
pub fn is_api_compatible(required_version: i64) -> bool {
    api_major_version(required_version) == api_major_version(get_api_version())
}

/// Convert a YYYYMMDD version to a YYYY-MM-DD date string
pub fn version_date_string(version: i64) -> String {
    let year = version / 10000;
    let month = (version % 10000) / 100;
    let day = version % 100;
    format!("{year:04}-{month:02}-{day:02}")
}

/// Get version information as a JSON string
pub fn get_version_info() -> String {
    let version = get_api_version();
    format!(
        r#"{{"api_version": {}, "release_date": "{}", "version_format": "YYYYMMDD"}}"#,
        version,
        version_date_string(version)
    )
}
