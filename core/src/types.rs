//! Shared primitive types used across the entire reward engine.

/// Money in minor currency units (euro cents).
pub type Cents = u64;

/// A stable, unique identifier for a user account.
pub type UserId = String;

/// The canonical session identifier (one engine lifetime).
pub type SessionId = String;

/// Convert a euro amount from configuration into cents.
/// Negative and non-finite amounts clamp to zero.
pub fn euros_to_cents(euros: f64) -> Cents {
    if !euros.is_finite() || euros <= 0.0 {
        return 0;
    }
    (euros * 100.0).round() as Cents
}

pub fn cents_to_euros(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euro_amounts_round_to_nearest_cent() {
        assert_eq!(euros_to_cents(0.6), 60);
        assert_eq!(euros_to_cents(0.1 + 0.2), 30);
        assert_eq!(euros_to_cents(10.0), 1_000);
        assert_eq!(euros_to_cents(-3.0), 0);
        assert_eq!(euros_to_cents(f64::NAN), 0);
    }
}
