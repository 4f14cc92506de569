/// Canonical form of an Azure region: lower-case with spaces removed, so
/// `"West Europe"` and `"westeurope"` compare equal.
pub fn normalize_location(input: &str) -> String {
    input.replace(' ', "").to_lowercase()
}
