//! Watch face text: local time and date rendered from format templates.
//!
//! Templates use .NET-style custom tokens (`h:mm tt`, `HH:mm`,
//! `ddd, MMM d`). Calendar data and month/day names come from chrono.

use std::cell::Cell;
use std::fmt::Write;
use std::rc::Rc;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use tracing::debug;

/// 12-hour clock with AM/PM designator.
pub const TIME_FORMAT_12H: &str = "h:mm tt";
/// 24-hour clock.
pub const TIME_FORMAT_24H: &str = "HH:mm";
pub const DEFAULT_DATE_FORMAT: &str = "ddd, MMM d";

/// Lower bound for the refresh interval (seconds).
pub const MIN_UPDATE_INTERVAL_S: f64 = 0.05;

// ── Clock ──────────────────────────────────────────────────

/// Source of local wall-clock time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// The platform's local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Settable clock for tests and simulations.
#[derive(Debug)]
pub struct FixedClock {
    time: Cell<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(time: NaiveDateTime) -> Self {
        Self {
            time: Cell::new(time),
        }
    }

    pub fn set(&self, time: NaiveDateTime) {
        self.time.set(time);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.time.get()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

// ── Template rendering ─────────────────────────────────────

/// Render `dt` with a .NET-style custom format template.
///
/// Supported: `h hh H HH m mm s ss t tt d dd ddd dddd M MM MMM MMMM y yy
/// yyyy`. Text in single or double quotes is literal, `\` escapes the next
/// character, anything else is copied through.
pub fn format_template(dt: &NaiveDateTime, template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 8);
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                i += 1;
                while i < chars.len() && chars[i] != c {
                    out.push(chars[i]);
                    i += 1;
                }
                i += 1; // closing quote
            }
            '\\' => {
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                }
                i += 2;
            }
            'h' | 'H' | 'm' | 's' | 't' | 'd' | 'M' | 'y' => {
                let mut run = 1;
                while i + run < chars.len() && chars[i + run] == c {
                    run += 1;
                }
                write_token(&mut out, dt, c, run);
                i += run;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

fn write_token(out: &mut String, dt: &NaiveDateTime, token: char, run: usize) {
    // Writing into a String cannot fail
    let _ = match (token, run) {
        ('h', 1) => write!(out, "{}", dt.hour12().1),
        ('h', _) => write!(out, "{:02}", dt.hour12().1),
        ('H', 1) => write!(out, "{}", dt.hour()),
        ('H', _) => write!(out, "{:02}", dt.hour()),
        ('m', 1) => write!(out, "{}", dt.minute()),
        ('m', _) => write!(out, "{:02}", dt.minute()),
        ('s', 1) => write!(out, "{}", dt.second()),
        ('s', _) => write!(out, "{:02}", dt.second()),
        ('t', 1) => out.write_str(if dt.hour12().0 { "P" } else { "A" }),
        ('t', _) => out.write_str(if dt.hour12().0 { "PM" } else { "AM" }),
        ('d', 1) => write!(out, "{}", dt.day()),
        ('d', 2) => write!(out, "{:02}", dt.day()),
        ('d', 3) => write!(out, "{}", dt.format("%a")),
        ('d', _) => write!(out, "{}", dt.format("%A")),
        ('M', 1) => write!(out, "{}", dt.month()),
        ('M', 2) => write!(out, "{:02}", dt.month()),
        ('M', 3) => write!(out, "{}", dt.format("%b")),
        ('M', _) => write!(out, "{}", dt.format("%B")),
        ('y', 1) => write!(out, "{}", dt.year().rem_euclid(100)),
        ('y', 2) => write!(out, "{:02}", dt.year().rem_euclid(100)),
        ('y', n) => write!(out, "{:0width$}", dt.year(), width = n),
        _ => Ok(()),
    };
}

// ── Formatter ──────────────────────────────────────────────

/// Templates and refresh rate for the watch face text.
#[derive(Debug, Clone)]
pub struct TimeFormatConfig {
    pub time_format: String,
    pub date_format: String,
    /// Seconds between re-renders.
    pub update_interval_s: f64,
}

impl Default for TimeFormatConfig {
    fn default() -> Self {
        Self {
            time_format: TIME_FORMAT_12H.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            update_interval_s: 1.0,
        }
    }
}

/// Polls the clock and keeps the rendered time/date strings current.
pub struct TimeFormatter {
    config: TimeFormatConfig,
    clock: Box<dyn Clock>,
    last_render_s: Option<f64>,
    time_text: String,
    date_text: String,
}

impl TimeFormatter {
    pub fn new(config: TimeFormatConfig, clock: Box<dyn Clock>) -> Self {
        let mut formatter = Self {
            config,
            clock,
            last_render_s: None,
            time_text: String::new(),
            date_text: String::new(),
        };
        formatter.force_update();
        formatter
    }

    pub fn config(&self) -> &TimeFormatConfig {
        &self.config
    }

    /// Re-render if at least one interval has passed since the last tick render.
    /// Returns true when the text was refreshed.
    pub fn tick(&mut self, now_s: f64) -> bool {
        let due = match self.last_render_s {
            Some(last) => now_s - last >= self.config.update_interval_s,
            None => true,
        };
        if !due {
            return false;
        }
        self.render();
        self.last_render_s = Some(now_s);
        true
    }

    /// Re-render now, outside the interval schedule.
    pub fn force_update(&mut self) {
        self.render();
    }

    fn render(&mut self) {
        let now = self.clock.now();
        self.time_text = format_template(&now, &self.config.time_format);
        self.date_text = format_template(&now, &self.config.date_format);
    }

    pub fn set_time_format(&mut self, format: &str) {
        debug!("time format: {:?}", format);
        self.config.time_format = format.to_string();
        self.force_update();
    }

    pub fn set_date_format(&mut self, format: &str) {
        debug!("date format: {:?}", format);
        self.config.date_format = format.to_string();
        self.force_update();
    }

    /// Switch between the 24-hour and 12-hour (AM/PM) time templates.
    pub fn set_24_hour(&mut self, enabled: bool) {
        self.set_time_format(if enabled { TIME_FORMAT_24H } else { TIME_FORMAT_12H });
    }

    pub fn is_24_hour(&self) -> bool {
        self.config.time_format == TIME_FORMAT_24H
    }

    pub fn set_update_interval(&mut self, seconds: f64) {
        self.config.update_interval_s = seconds.max(MIN_UPDATE_INTERVAL_S);
    }

    pub fn time_text(&self) -> &str {
        &self.time_text
    }

    pub fn date_text(&self) -> &str {
        &self.date_text
    }

    /// Status s-expression for the control surface.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:time \"{}\" :date \"{}\" :time-format \"{}\" :date-format \"{}\" :update-interval {:.2})",
            escape(&self.time_text),
            escape(&self.date_text),
            escape(&self.config.time_format),
            escape(&self.config.date_format),
            self.config.update_interval_s,
        )
    }
}

pub(crate) fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, s))
            .expect("valid test timestamp")
    }

    #[test]
    fn test_12_and_24_hour_templates() {
        let t = at(2024, 3, 15, 13, 30, 0);
        assert_eq!(format_template(&t, "h:mm tt"), "1:30 PM");
        assert_eq!(format_template(&t, "HH:mm"), "13:30");
    }

    #[test]
    fn test_midnight_and_noon() {
        assert_eq!(format_template(&at(2024, 1, 1, 0, 5, 0), "h:mm tt"), "12:05 AM");
        assert_eq!(format_template(&at(2024, 1, 1, 12, 0, 0), "hh:mm t"), "12:00 P");
        assert_eq!(format_template(&at(2024, 1, 1, 9, 7, 3), "H:m:s"), "9:7:3");
        assert_eq!(format_template(&at(2024, 1, 1, 9, 7, 3), "HH:mm:ss"), "09:07:03");
    }

    #[test]
    fn test_date_tokens() {
        let t = at(2024, 3, 5, 8, 0, 0); // Tuesday
        assert_eq!(format_template(&t, "ddd, MMM d"), "Tue, Mar 5");
        assert_eq!(format_template(&t, "dddd, MMMM dd"), "Tuesday, March 05");
        assert_eq!(format_template(&t, "M/d/yy"), "3/5/24");
        assert_eq!(format_template(&t, "yyyy-MM-dd"), "2024-03-05");
        assert_eq!(format_template(&t, "y"), "24");
    }

    #[test]
    fn test_literals_and_escapes() {
        let t = at(2024, 3, 5, 8, 0, 0);
        assert_eq!(format_template(&t, "'day' d"), "day 5");
        assert_eq!(format_template(&t, "\"at\" H"), "at 8");
        assert_eq!(format_template(&t, "\\h H"), "h 8");
        assert_eq!(format_template(&t, "H:mm | ok"), "8:00 | ok");
    }

    #[test]
    fn test_interval_gating() {
        let clock = Rc::new(FixedClock::new(at(2024, 3, 15, 13, 30, 0)));
        let mut f = TimeFormatter::new(TimeFormatConfig::default(), Box::new(clock.clone()));
        assert_eq!(f.time_text(), "1:30 PM");

        assert!(f.tick(0.0));
        clock.set(at(2024, 3, 15, 13, 31, 0));
        assert!(!f.tick(0.5));
        assert_eq!(f.time_text(), "1:30 PM");
        assert!(f.tick(1.0));
        assert_eq!(f.time_text(), "1:31 PM");
    }

    #[test]
    fn test_force_update_and_setters() {
        let clock = Rc::new(FixedClock::new(at(2024, 3, 15, 13, 30, 0)));
        let mut f = TimeFormatter::new(TimeFormatConfig::default(), Box::new(clock.clone()));
        f.tick(0.0);

        clock.set(at(2024, 3, 15, 14, 45, 0));
        f.force_update();
        assert_eq!(f.time_text(), "2:45 PM");

        f.set_24_hour(true);
        assert!(f.is_24_hour());
        assert_eq!(f.time_text(), "14:45");
        f.set_24_hour(false);
        assert_eq!(f.time_text(), "2:45 PM");

        f.set_date_format("yyyy/MM/dd");
        assert_eq!(f.date_text(), "2024/03/15");
    }

    #[test]
    fn test_update_interval_clamped() {
        let mut f = TimeFormatter::new(TimeFormatConfig::default(), Box::new(SystemClock));
        f.set_update_interval(0.0);
        assert_eq!(f.config().update_interval_s, MIN_UPDATE_INTERVAL_S);
    }

    #[test]
    fn test_status_sexp_escapes() {
        let clock = FixedClock::new(at(2024, 3, 15, 13, 30, 0));
        let mut f = TimeFormatter::new(TimeFormatConfig::default(), Box::new(clock));
        f.set_time_format("'\"'H");
        let sexp = f.status_sexp();
        assert!(sexp.contains(":time \"\\\"13\""), "got {}", sexp);
    }
}
