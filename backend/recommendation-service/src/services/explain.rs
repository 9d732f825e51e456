use crate::models::PreferenceVector;

pub const POPULAR_EXPLANATION: &str = "Recommended from the roles that are popular right now.";
pub const GENERIC_EXPLANATION: &str = "Recommended based on your preferences.";

fn plural(count: u32, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("your 1 {}", singular)
    } else {
        format!("your {} {}", count, plural)
    }
}

/// "a", "a and b", "a, b and c"
fn join_reasons(reasons: &[String]) -> String {
    match reasons {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

/// Human-readable reason for a list of `item_count` recommendations
pub fn explain(vector: &PreferenceVector, item_count: usize) -> String {
    if vector.is_empty() {
        return POPULAR_EXPLANATION.to_string();
    }

    let mut reasons = Vec::new();
    if let Some(category) = &vector.preferred_category {
        reasons.push(format!("your interest in {} roles", category));
    }
    if vector.total_chats > 0 {
        reasons.push(plural(vector.total_chats, "chat", "chats"));
    }
    if vector.total_views > 0 {
        reasons.push(plural(vector.total_views, "view", "views"));
    }

    if reasons.is_empty() {
        return GENERIC_EXPLANATION.to_string();
    }

    let picked = match item_count {
        0 => "we picked these roles for you".to_string(),
        1 => "we picked this role for you".to_string(),
        n => format!("we picked these {} roles for you", n),
    };

    format!("Based on {}, {}.", join_reasons(&reasons), picked)
}
