/// Maps a US state code to its census-style region. Unknown or empty
/// codes fall back to "Other".
pub fn region_for_state(state_code: &str) -> &'static str {
    match state_code {
        "NY" | "PA" | "NJ" | "MA" | "CT" | "RI" | "VT" | "NH" | "ME" => "Northeast",
        "FL" | "GA" | "SC" | "NC" | "VA" | "WV" | "KY" | "TN" | "AL" | "MS" | "AR" | "LA" => {
            "Southeast"
        }
        "OH" | "MI" | "IN" | "IL" | "WI" | "MN" | "IA" | "MO" | "ND" | "SD" | "NE" | "KS" => {
            "Midwest"
        }
        "TX" | "OK" | "NM" | "AZ" => "Southwest",
        "CA" | "NV" | "UT" | "CO" | "WY" | "MT" | "ID" | "WA" | "OR" | "AK" | "HI" => "West",
        _ => "Other",
    }
}
