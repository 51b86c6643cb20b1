//! Control message dispatch: parse s-expression plists and apply them to
//! the watch.

use lexpr::Value;
use tracing::{debug, warn};

use crate::vr::{Hand, Vec3};
use crate::watch::{WatchEvent, WristWatch};

/// Parse a control message and apply it. Returns the reply s-expression.
pub fn handle_message(watch: &mut WristWatch, raw: &str) -> Option<String> {
    let value = match lexpr::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("malformed s-expression: {}", e);
            return Some(error_response(0, &format!("malformed s-expression: {e}")));
        }
    };

    let msg_type = get_keyword(&value, "type");
    let msg_id = get_int(&value, "id").unwrap_or(0);
    debug!(msg_id, "control message: {:?}", msg_type);

    match msg_type.as_deref() {
        Some("watch-status") => Some(status_response(watch, msg_id)),
        Some("watch-config") => handle_watch_config(watch, msg_id, &value),
        Some("watch-time-format") => handle_time_format(watch, msg_id, &value),
        Some("watch-date-format") => handle_date_format(watch, msg_id, &value),
        Some("watch-24-hour") => handle_24_hour(watch, msg_id, &value),
        Some("watch-refresh") => {
            watch.time.force_update();
            Some(status_response(watch, msg_id))
        }
        Some("watch-show") => {
            watch.set_immediate(true);
            Some(status_response(watch, msg_id))
        }
        Some("watch-hide") => {
            watch.set_immediate(false);
            Some(status_response(watch, msg_id))
        }
        Some(other) => Some(error_response(msg_id, &format!("unknown message type: {other}"))),
        None => Some(error_response(msg_id, "missing :type")),
    }
}

fn status_response(watch: &WristWatch, msg_id: i64) -> String {
    format!(
        "(:type :response :id {} :status :ok :watch {})",
        msg_id,
        watch.status_sexp()
    )
}

fn config_response(watch: &WristWatch, msg_id: i64) -> String {
    format!(
        "(:type :response :id {} :status :ok :config {})",
        msg_id,
        watch.config_sexp()
    )
}

fn handle_watch_config(watch: &mut WristWatch, msg_id: i64, value: &Value) -> Option<String> {
    if let Some(hand_str) = get_string(value, "hand") {
        match Hand::parse(&hand_str) {
            Some(hand) => watch.tracker.config.hand = hand,
            None => {
                return Some(error_response(
                    msg_id,
                    &format!("invalid :hand {hand_str} (left or right)"),
                ))
            }
        }
    }
    if let Some(offset) = get_vec3(value, "position-offset") {
        watch.tracker.config.position_offset = offset;
    }
    if let Some(offset) = get_vec3(value, "rotation-offset") {
        watch.tracker.config.rotation_offset_deg = offset;
    }
    if let Some(enabled) = get_bool(value, "smoothing") {
        watch.tracker.config.smoothing = enabled;
    }
    if let Some(speed) = get_float(value, "smoothing-speed") {
        watch.tracker.config.smoothing_speed = speed.max(0.0) as f32;
    }
    if let Some(enabled) = get_bool(value, "palm-gating") {
        watch.tracker.config.palm_gating = enabled;
    }
    if let Some(threshold) = get_float(value, "palm-up-threshold") {
        watch.tracker.config.set_palm_up_threshold(threshold as f32);
    }
    if let Some(enabled) = get_bool(value, "wrist-height-gate") {
        watch.tracker.config.wrist_height_gate = enabled;
    }
    if let Some(height) = get_float(value, "min-wrist-height") {
        watch.tracker.config.min_wrist_height_m = height as f32;
    }
    if let Some(ms) = get_float(value, "fade-ms") {
        watch.fader.config.fade_duration_ms = ms.max(0.0);
    }
    if let Some(ms) = get_float(value, "palm-fade-ms") {
        watch.fader.config.palm_fade_duration_ms = ms.max(0.0);
    }
    if let Some(ms) = get_float(value, "tracking-debounce-ms") {
        watch.fader.config.tracking_debounce_ms = ms.max(0.0);
    }
    if let Some(ms) = get_float(value, "palm-debounce-ms") {
        watch.fader.config.palm_debounce_ms = ms.max(0.0);
    }
    if let Some(seconds) = get_float(value, "update-interval") {
        watch.time.set_update_interval(seconds);
    }
    if let Some(format) = get_string(value, "time-format") {
        watch.time.set_time_format(&format);
    }
    if let Some(format) = get_string(value, "date-format") {
        watch.time.set_date_format(&format);
    }

    Some(config_response(watch, msg_id))
}

fn handle_time_format(watch: &mut WristWatch, msg_id: i64, value: &Value) -> Option<String> {
    match get_string(value, "format") {
        Some(format) => {
            watch.time.set_time_format(&format);
            Some(status_response(watch, msg_id))
        }
        None => Some(error_response(msg_id, "missing :format")),
    }
}

fn handle_date_format(watch: &mut WristWatch, msg_id: i64, value: &Value) -> Option<String> {
    match get_string(value, "format") {
        Some(format) => {
            watch.time.set_date_format(&format);
            Some(status_response(watch, msg_id))
        }
        None => Some(error_response(msg_id, "missing :format")),
    }
}

fn handle_24_hour(watch: &mut WristWatch, msg_id: i64, value: &Value) -> Option<String> {
    let enabled = get_bool(value, "enabled").unwrap_or(!watch.time.is_24_hour());
    watch.time.set_24_hour(enabled);
    Some(status_response(watch, msg_id))
}

// ── Response helpers ───────────────────────────────────────

fn error_response(id: i64, reason: &str) -> String {
    format!(
        "(:type :response :id {} :status :error :reason \"{}\")",
        id,
        escape_string(reason)
    )
}

/// Escape a string for s-expression output.
fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Format an output event s-expression.
pub fn format_event(event: WatchEvent) -> String {
    format!("(:type :event :event :{})", event.as_str())
}

// ── Plist access ───────────────────────────────────────────

/// Find the value following `:key` in a plist.
/// Accepts both `Value::Keyword("key")` and `Value::Symbol(":key")` forms.
fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    while let Value::Cons(pair) = current {
        let is_key = match pair.car() {
            Value::Keyword(k) => k.as_ref() == key,
            Value::Symbol(s) => s.as_ref() == prefixed,
            _ => false,
        };
        if is_key {
            return match pair.cdr() {
                Value::Cons(next) => Some(next.car()),
                _ => None,
            };
        }
        current = pair.cdr();
    }
    None
}

/// Atom value following `:key`, rendered as a string.
fn get_keyword(value: &Value, key: &str) -> Option<String> {
    let val = get_value(value, key)?;
    Some(match val {
        Value::Keyword(v) => v.to_string(),
        Value::Symbol(v) => v.strip_prefix(':').unwrap_or(&**v).to_string(),
        Value::String(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => (if *b { "t" } else { "nil" }).to_string(),
        Value::Null | Value::Nil => "nil".to_string(),
        _ => val.to_string(),
    })
}

fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

fn get_string(value: &Value, key: &str) -> Option<String> {
    get_keyword(value, key)
}

/// Treats "nil" as false, anything else as true.
fn get_bool(value: &Value, key: &str) -> Option<bool> {
    get_keyword(value, key).map(|s| s != "nil")
}

/// Finite number following `:key`; `nan` and `inf` spellings are refused.
fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_keyword(value, key)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|f| f.is_finite())
}

/// Three-number list following `:key`, e.g. `:position-offset (0 0.02 0)`.
fn get_vec3(value: &Value, key: &str) -> Option<Vec3> {
    let list = get_value(value, key)?;
    let nums: Vec<f32> = flatten_list(list)
        .into_iter()
        .map(|v| match v {
            Value::Number(n) => n.as_f64().map(|f| f as f32),
            _ => None,
        })
        .collect::<Option<Vec<f32>>>()?;
    match nums.as_slice() {
        [x, y, z] => Some(Vec3::new(*x, *y, *z)),
        _ => None,
    }
}

/// Flatten a possibly nested list/cons structure into its leaf values.
fn flatten_list(value: &Value) -> Vec<&Value> {
    let mut result = Vec::new();
    fn walk<'a>(v: &'a Value, out: &mut Vec<&'a Value>) {
        match v {
            Value::Cons(pair) => {
                walk(pair.car(), out);
                walk(pair.cdr(), out);
            }
            Value::Null => {}
            other => out.push(other),
        }
    }
    walk(value, &mut result);
    result
}
