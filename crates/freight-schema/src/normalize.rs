//! Header-name normalization shared by alias resolution and the mapping
//! engine.

/// Normalizes a header or alias for comparison: lowercases, turns
/// separator punctuation into spaces, drops everything else that is not
/// alphanumeric, and collapses runs of whitespace.
pub fn normalize_header(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        if ch.is_alphanumeric() {
            cleaned.extend(ch.to_lowercase());
        } else if matches!(ch, '_' | '-' | '.' | '/' | '\\') || ch.is_whitespace() {
            cleaned.push(' ');
        }
        // Anything else ('#', '(', currency marks, ...) is dropped.
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits a normalized name into canonical tokens.
///
/// Common freight shorthand collapses onto one token so that `cust_name`
/// and `Customer Name`, or `dest city` and `delivery city`, compare equal.
pub fn tokenize(raw: &str) -> Vec<String> {
    normalize_header(raw)
        .split_whitespace()
        .filter_map(canonical_token)
        .collect()
}

fn canonical_token(token: &str) -> Option<String> {
    if is_stopword(token) {
        return None;
    }
    let mapped = match token {
        "cust" | "customer" | "shipper" | "client" => "customer",
        "dest" | "destination" | "delivery" | "dropoff" | "consignee" => "dropoff",
        "origin" | "pickup" | "from" => "pickup",
        "qty" | "quantity" | "units" | "pieces" => "quantity",
        "wt" | "weight" | "lbs" => "weight",
        "ref" | "reference" | "id" | "number" | "num" | "no" => "id",
        "appt" | "appointment" => "appointment",
        "dt" | "date" | "day" => "date",
        "st" | "state" | "province" => "state",
        "zip" | "zipcode" | "postal" | "postcode" => "zip",
        "equip" | "equipment" | "trailer" => "equipment",
        other => other,
    };
    Some(mapped.to_string())
}

fn is_stopword(token: &str) -> bool {
    matches!(token, "of" | "and" | "the" | "to" | "for" | "in" | "a" | "an")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_become_spaces() {
        assert_eq!(normalize_header("Load_ID"), "load id");
        assert_eq!(normalize_header("pickup-date "), "pickup date");
        assert_eq!(normalize_header("Weight (lbs)"), "weight lbs");
    }

    #[test]
    fn symbols_are_dropped() {
        assert_eq!(normalize_header("Load #"), "load");
        assert_eq!(normalize_header("$ Amount"), "amount");
    }

    #[test]
    fn tokens_share_a_canonical_form() {
        assert_eq!(tokenize("cust_name"), tokenize("Customer Name"));
        assert_eq!(tokenize("dest city"), tokenize("delivery_city"));
        assert_eq!(tokenize("origin zip"), tokenize("pickup postal"));
    }
}
