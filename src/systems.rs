//! Per-ruleset entity data accessors
//!
//! Different game systems shape their actor data differently. Instead of an
//! inheritance ladder, a small registry maps a system identifier to a
//! capability record of pure accessor functions over the raw entity JSON.
//! Unknown systems fall back to the common `attributes.hp.{value,max}` shape.

use serde_json::Value;

/// Pure accessors over a generically-typed entity blob
pub struct SystemAdapter {
    pub id: &'static str,
    pub current_hp: fn(&Value) -> Option<f64>,
    pub max_hp: fn(&Value) -> Option<f64>,
    pub creature_type: fn(&Value) -> Option<String>,
}

fn path<'a>(value: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments.iter().try_fold(value, |v, key| v.get(key))
}

fn path_f64(value: &Value, segments: &[&str]) -> Option<f64> {
    path(value, segments)?.as_f64()
}

fn path_str(value: &Value, segments: &[&str]) -> Option<String> {
    path(value, segments)?.as_str().map(str::to_string)
}

static DND5E: SystemAdapter = SystemAdapter {
    id: "dnd5e",
    current_hp: |v| path_f64(v, &["attributes", "hp", "value"]),
    max_hp: |v| path_f64(v, &["attributes", "hp", "max"]),
    creature_type: |v| path_str(v, &["details", "type", "value"]),
};

static PF2E: SystemAdapter = SystemAdapter {
    id: "pf2e",
    current_hp: |v| path_f64(v, &["attributes", "hp", "value"]),
    max_hp: |v| path_f64(v, &["attributes", "hp", "max"]),
    creature_type: |v| path_str(v, &["details", "creatureType"]),
};

static WFRP4E: SystemAdapter = SystemAdapter {
    id: "wfrp4e",
    current_hp: |v| path_f64(v, &["status", "wounds", "value"]),
    max_hp: |v| path_f64(v, &["status", "wounds", "max"]),
    creature_type: |v| path_str(v, &["details", "species", "value"]),
};

/// Fallback for systems without a dedicated adapter
static GENERIC: SystemAdapter = SystemAdapter {
    id: "generic",
    current_hp: |v| path_f64(v, &["attributes", "hp", "value"]),
    max_hp: |v| path_f64(v, &["attributes", "hp", "max"]),
    creature_type: |v| path_str(v, &["details", "type"]),
};

/// Look up the adapter for a system identifier
pub fn adapter_for(system_id: &str) -> &'static SystemAdapter {
    match system_id {
        "dnd5e" => &DND5E,
        "pf2e" => &PF2E,
        "wfrp4e" => &WFRP4E,
        _ => &GENERIC,
    }
}

/// Default blood color: dark red
pub const DEFAULT_BLOOD_COLOR: &str = "#8a0707";

/// Blood color for a creature type; unknown or missing types bleed red
pub fn blood_color(creature_type: Option<&str>) -> &'static str {
    let Some(kind) = creature_type else {
        return DEFAULT_BLOOD_COLOR;
    };
    match kind.to_ascii_lowercase().as_str() {
        "undead" => "#3b3b3b",
        "construct" => "#787878",
        "ooze" => "#2e8b57",
        "plant" => "#556b2f",
        "elemental" => "#4682b4",
        "fiend" => "#1a0000",
        "celestial" => "#ffd700",
        _ => DEFAULT_BLOOD_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dnd5e_accessors() {
        let actor = json!({
            "attributes": { "hp": { "value": 12, "max": 20 } },
            "details": { "type": { "value": "undead" } }
        });
        let adapter = adapter_for("dnd5e");
        assert_eq!((adapter.current_hp)(&actor), Some(12.0));
        assert_eq!((adapter.max_hp)(&actor), Some(20.0));
        assert_eq!((adapter.creature_type)(&actor), Some("undead".to_string()));
    }

    #[test]
    fn test_wfrp4e_uses_wounds() {
        let actor = json!({
            "status": { "wounds": { "value": 8, "max": 14 } }
        });
        let adapter = adapter_for("wfrp4e");
        assert_eq!((adapter.current_hp)(&actor), Some(8.0));
        assert_eq!((adapter.max_hp)(&actor), Some(14.0));
    }

    #[test]
    fn test_unknown_system_gets_generic() {
        let adapter = adapter_for("somebrew");
        assert_eq!(adapter.id, "generic");
        let actor = json!({ "attributes": { "hp": { "value": 3, "max": 9 } } });
        assert_eq!((adapter.current_hp)(&actor), Some(3.0));
    }

    #[test]
    fn test_missing_health_is_none() {
        let actor = json!({ "name": "statue" });
        let adapter = adapter_for("dnd5e");
        assert_eq!((adapter.current_hp)(&actor), None);
    }

    #[test]
    fn test_blood_color_defaults_red() {
        assert_eq!(blood_color(None), DEFAULT_BLOOD_COLOR);
        assert_eq!(blood_color(Some("humanoid")), DEFAULT_BLOOD_COLOR);
        assert_eq!(blood_color(Some("Ooze")), "#2e8b57");
    }
}
