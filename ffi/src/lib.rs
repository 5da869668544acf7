use engine::api::{simulate_battle, simulate_battle_many, BattleConfig};
use engine::content;
use engine::progression::{FileBackend, ProgressionStore};
use engine::record::DEFAULT_IDENTITY_MARKER;
use engine::{CharacterRecord, StatKind};
use jni::objects::{JClass, JString};
use jni::sys::jstring;
use jni::JNIEnv;
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_SAMPLES: u32 = 100;

/// `{"ok":true,"result":…}` or `{"ok":false,"error":"…"}`.
fn envelope(result: Result<Value, String>) -> String {
    match result {
        Ok(value) => json!({ "ok": true, "result": value }).to_string(),
        Err(e) => json!({ "ok": false, "error": e }).to_string(),
    }
}

fn to_jstring(env: &JNIEnv, text: String) -> jstring {
    env.new_string(text)
        .map(|s| s.into_raw())
        .unwrap_or(std::ptr::null_mut())
}

fn with_json_arg(mut env: JNIEnv, json: JString, f: fn(&str) -> String) -> jstring {
    let out = match env.get_string(&json) {
        Ok(s) => f(&String::from(s)),
        Err(e) => envelope(Err(e.to_string())),
    };
    to_jstring(&env, out)
}

fn to_value(v: impl serde::Serialize) -> Result<Value, String> {
    serde_json::to_value(v).map_err(|e| e.to_string())
}

pub fn roster_internal() -> String {
    let roster: Result<Vec<CharacterRecord>, _> = content::builtin_characters()
        .iter()
        .map(|raw| CharacterRecord::from_raw(raw, DEFAULT_IDENTITY_MARKER))
        .collect();
    envelope(roster.map_err(|e| e.to_string()).and_then(to_value))
}

pub fn simulate_battle_internal(input: &str) -> String {
    let result = serde_json::from_str::<BattleConfig>(input)
        .map_err(|e| format!("invalid_config: {}", e))
        .and_then(|cfg| simulate_battle(cfg).map_err(|e| format!("{:#}", e)))
        .and_then(to_value);
    envelope(result)
}

pub fn simulate_battle_many_internal(input: &str) -> String {
    let mut root: Value = match serde_json::from_str(input) {
        Ok(v) => v,
        Err(e) => return envelope(Err(format!("invalid_config: {}", e))),
    };
    let samples = root
        .get("samples")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(DEFAULT_SAMPLES);
    if let Some(obj) = root.as_object_mut() {
        obj.remove("samples");
    }
    let result = serde_json::from_value::<BattleConfig>(root)
        .map_err(|e| format!("invalid_config: {}", e))
        .and_then(|cfg| simulate_battle_many(cfg, samples).map_err(|e| format!("{:#}", e)))
        .and_then(to_value);
    envelope(result)
}

#[derive(Deserialize)]
struct SpendPoint {
    store_path: String,
    uuid: String,
    stat: String,
}

pub fn spend_point_internal(input: &str) -> String {
    let req: SpendPoint = match serde_json::from_str(input) {
        Ok(r) => r,
        Err(e) => return envelope(Err(format!("invalid_request: {}", e))),
    };
    let stat: StatKind = match req.stat.parse() {
        Ok(s) => s,
        Err(e) => return envelope(Err(e)),
    };
    let mut store = ProgressionStore::load(FileBackend::new(&req.store_path));
    if !store.spend_point(&req.uuid, stat) {
        return envelope(Err(format!("no point to spend for '{}'", req.uuid)));
    }
    envelope(store.get(&req.uuid).map_or(Ok(Value::Null), to_value))
}

#[no_mangle]
pub extern "system" fn Java_com_beyonder_Ffi_version(env: JNIEnv, _class: JClass) -> jstring {
    to_jstring(&env, format!("beyonder-ffi {}", env!("CARGO_PKG_VERSION")))
}

#[no_mangle]
pub extern "system" fn Java_com_beyonder_Ffi_rosterJson(env: JNIEnv, _class: JClass) -> jstring {
    to_jstring(&env, roster_internal())
}

#[no_mangle]
pub extern "system" fn Java_com_beyonder_Ffi_simulateBattleJson(
    env: JNIEnv,
    _class: JClass,
    json: JString,
) -> jstring {
    with_json_arg(env, json, simulate_battle_internal)
}

#[no_mangle]
pub extern "system" fn Java_com_beyonder_Ffi_simulateBattleManyJson(
    env: JNIEnv,
    _class: JClass,
    json: JString,
) -> jstring {
    with_json_arg(env, json, simulate_battle_many_internal)
}

#[no_mangle]
pub extern "system" fn Java_com_beyonder_Ffi_spendPointJson(
    env: JNIEnv,
    _class: JClass,
    json: JString,
) -> jstring {
    with_json_arg(env, json, spend_point_internal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(out: String) -> Value {
        serde_json::from_str(&out).unwrap()
    }

    #[test]
    fn roster_lists_six_characters() {
        let out = parse(roster_internal());
        assert_eq!(out["ok"], true);
        assert_eq!(out["result"].as_array().map(Vec::len), Some(6));
        assert_eq!(out["result"][0]["name"], "WARRIOR");
    }

    #[test]
    fn battle_round_trips_through_json() {
        let input = r#"{"team_one":["warrior"],"team_two":["mage"],"arena":{"seed":9}}"#;
        let first = parse(simulate_battle_internal(input));
        let second = parse(simulate_battle_internal(input));
        assert_eq!(first["ok"], true);
        assert_eq!(first["result"]["log"], second["result"]["log"]);
    }

    #[test]
    fn bad_input_is_an_error_envelope() {
        let out = parse(simulate_battle_internal("{ nope"));
        assert_eq!(out["ok"], false);
        assert!(out["error"].as_str().unwrap().starts_with("invalid_config"));

        // quotes in messages stay valid JSON
        let out = parse(simulate_battle_internal(
            r#"{"team_one":["\"odd\""],"team_two":["mage"]}"#,
        ));
        assert_eq!(out["ok"], false);
    }

    #[test]
    fn many_defaults_and_reads_samples() {
        let out = parse(simulate_battle_many_internal(
            r#"{"team_one":["ninja"],"team_two":["knight"],"samples":12}"#,
        ));
        assert_eq!(out["result"]["samples"], 12);
    }

    #[test]
    fn spend_point_rejects_unknown_stat() {
        let out = parse(spend_point_internal(
            r#"{"store_path":"unused.json","uuid":"beyonder-x","stat":"luck"}"#,
        ));
        assert_eq!(out["ok"], false);
    }
}
