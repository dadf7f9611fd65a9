use glam::Vec3;

/// Length of the horizontal (x, y) part of a vector; z is up in region space
pub fn horizontal_speed(velocity: Vec3) -> f32 {
    velocity.truncate().length()
}

/// Utility functions for parsing Second Life data formats
pub mod parsing {
    use std::collections::HashMap;

    /// Parse a boolean the lenient way the simulator sends them.
    /// Anything unrecognised is false.
    pub fn parse_bool(value: &str) -> bool {
        matches!(
            value.trim().to_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )
    }

    /// Parse a float, treating ',' as the decimal separator too
    pub fn parse_f32_or(value: &str, default: f32) -> f32 {
        value
            .trim()
            .replace(',', ".")
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }

    /// Parse an integer, falling back to `default`. A decimal value with
    /// ',' or '.' is truncated, as the simulator sometimes sends "2.0".
    pub fn parse_i32_or(value: &str, default: i32) -> i32 {
        let cleaned = value.trim().replace(',', ".");
        if let Ok(v) = cleaned.parse::<i32>() {
            return v;
        }
        match cleaned.parse::<f64>() {
            Ok(v) if v.is_finite() => v.trunc().clamp(i32::MIN as f64, i32::MAX as f64) as i32,
            _ => default,
        }
    }

    /// Parse an ObjectUpdate NameValue block.
    ///
    /// Records are separated by newlines and come either as `Key = Value` or
    /// in the native `Key TYPE CLASS SENDTO value...` form, e.g.
    /// `FirstName STRING RW SV Ada`.
    pub fn parse_name_value_map(block: &str) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for line in block.split(['\n', '\r']) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if !key.is_empty() && !key.contains(char::is_whitespace) {
                    map.insert(key.to_string(), value.trim().to_string());
                    continue;
                }
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() >= 5 {
                map.insert(tokens[0].to_string(), tokens[4..].join(" "));
            } else if let Some(key) = tokens.first() {
                map.insert(key.to_string(), String::new());
            }
        }
        map
    }
}
