//! Templated explanations
//!
//! Turns the three component scores into the text shown alongside the
//! ShiftLag score: one headline explanation, one line per driver and a short
//! list of recommendations. Text is deterministic; no model is involved.

use crate::config::ShiftLagConfig;
use crate::instability::MIN_START_SAMPLES;
use crate::types::{
    InstabilityScore, MisalignmentScore, ShiftLagCategory, ShiftLagDrivers, SleepDebtScore,
};

/// Headline used when the score could not be computed
pub const FALLBACK_EXPLANATION: &str =
    "We couldn't calculate your shift lag right now. Keep logging sleep and shifts and check back soon.";

/// Component contributing most to the composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    SleepDebt,
    Misalignment,
    Instability,
}

impl Driver {
    fn phrase(&self) -> &'static str {
        match self {
            Driver::SleepDebt => "accumulated sleep debt",
            Driver::Misalignment => "working through your biological night",
            Driver::Instability => "irregular shift start times",
        }
    }
}

/// Rendered text for one result
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub explanation: String,
    pub drivers: ShiftLagDrivers,
    pub recommendations: Vec<String>,
}

/// Inputs the templates draw on
pub struct ExplanationInput<'a> {
    pub category: ShiftLagCategory,
    pub sleep_debt: &'a SleepDebtScore,
    pub misalignment: &'a MisalignmentScore,
    pub instability: &'a InstabilityScore,
    pub typical_sleep_hours: f64,
    pub config: &'a ShiftLagConfig,
}

/// Renders explanations, driver lines and recommendations
pub struct Explainer;

impl Explainer {
    pub fn render(input: &ExplanationInput<'_>) -> Explanation {
        let dominant = dominant_driver(input);

        Explanation {
            explanation: headline(input.category, dominant),
            drivers: driver_lines(input),
            recommendations: recommendations(input),
        }
    }

    /// Text for the zeroed result returned on failure
    pub fn fallback() -> Explanation {
        Explanation {
            explanation: FALLBACK_EXPLANATION.to_string(),
            drivers: ShiftLagDrivers {
                sleep_debt: "Sleep debt unavailable".to_string(),
                misalignment: "Night-work overlap unavailable".to_string(),
                instability: "Schedule stability unavailable".to_string(),
            },
            recommendations: vec![
                "Log your main sleep and upcoming shifts so we can track your body clock."
                    .to_string(),
            ],
        }
    }
}

/// Largest share of its own maximum; ties resolve in declaration order
pub fn dominant_driver(input: &ExplanationInput<'_>) -> Option<Driver> {
    let config = input.config;
    let share = |score: u8, max: u8| {
        if max == 0 {
            0.0
        } else {
            score as f64 / max as f64
        }
    };

    let candidates = [
        (
            Driver::SleepDebt,
            share(input.sleep_debt.score, config.sleep_debt_curve.max_score),
        ),
        (
            Driver::Misalignment,
            share(input.misalignment.score, config.misalignment_curve.max_score),
        ),
        (
            Driver::Instability,
            share(input.instability.score, config.instability_curve.max_score),
        ),
    ];

    let mut best: Option<(Driver, f64)> = None;
    for (driver, value) in candidates {
        if value <= 0.0 {
            continue;
        }
        match best {
            Some((_, top)) if top >= value => {}
            _ => best = Some((driver, value)),
        }
    }
    best.map(|(driver, _)| driver)
}

fn headline(category: ShiftLagCategory, dominant: Option<Driver>) -> String {
    match (category, dominant) {
        (ShiftLagCategory::Low, None) => {
            "Your body clock looks well aligned with your schedule.".to_string()
        }
        (ShiftLagCategory::Low, Some(driver)) => format!(
            "Your body clock looks well aligned with your schedule. The main thing to watch is {}.",
            driver.phrase()
        ),
        (ShiftLagCategory::Moderate, driver) => format!(
            "Your body clock is moderately out of sync, mostly driven by {}.",
            driver.map(|d| d.phrase()).unwrap_or("your recent schedule")
        ),
        (ShiftLagCategory::High, driver) => format!(
            "Your body clock is significantly out of sync, driven mainly by {}.",
            driver.map(|d| d.phrase()).unwrap_or("your recent schedule")
        ),
    }
}

fn driver_lines(input: &ExplanationInput<'_>) -> ShiftLagDrivers {
    let config = input.config;

    let sleep_debt = if input.sleep_debt.debt_hours > 0.0 {
        format!(
            "{:.1}h sleep debt over the last {} days against a typical need of {:.1}h",
            input.sleep_debt.debt_hours, config.sleep_debt_lookback_days, input.typical_sleep_hours
        )
    } else {
        format!(
            "No sleep debt over the last {} days (typical need {:.1}h)",
            config.sleep_debt_lookback_days, input.typical_sleep_hours
        )
    };

    let night = format!(
        "{}-{}",
        clock(config.night_start_hour),
        clock(config.night_end_hour)
    );
    let misalignment = if input.misalignment.shifts_considered == 0 {
        format!(
            "No shifts with start times in the last {} days",
            config.misalignment_lookback_days
        )
    } else if input.misalignment.avg_overlap_hours > 0.0 {
        format!(
            "Recent shifts averaged {:.1}h inside your biological night ({night})",
            input.misalignment.avg_overlap_hours
        )
    } else {
        format!("Recent shifts stayed outside your biological night ({night})")
    };

    let instability = if input.instability.samples < MIN_START_SAMPLES {
        "Not enough recent shifts to measure schedule stability".to_string()
    } else {
        format!(
            "Shift start times varied by about {:.1}h over the last {} days",
            input.instability.variability_hours, config.instability_lookback_days
        )
    };

    ShiftLagDrivers {
        sleep_debt,
        misalignment,
        instability,
    }
}

fn recommendations(input: &ExplanationInput<'_>) -> Vec<String> {
    let mut out = Vec::new();

    match input.sleep_debt.score {
        20..=u8::MAX => out.push(
            "Protect a longer anchor sleep on your next days off to pay back sleep debt."
                .to_string(),
        ),
        10..=19 => out.push(
            "Add a 20-30 minute nap before your next shift to chip away at sleep debt.".to_string(),
        ),
        _ => {}
    }

    match input.misalignment.score {
        25..=u8::MAX => {
            out.push(
                "Use bright light early in night shifts and wear sunglasses on the commute home."
                    .to_string(),
            );
            out.push("Keep your bedroom dark, quiet and cool for daytime sleep.".to_string());
        }
        1..=24 => out.push(
            "Keep light exposure low in the last hours before daytime sleep.".to_string(),
        ),
        _ => {}
    }

    match input.instability.score {
        10..=u8::MAX => out.push(
            "Where you can, ask for shifts that rotate forward (day, then evening, then night)."
                .to_string(),
        ),
        5..=9 => out.push(
            "Keep a consistent wake time on days off to give your body clock an anchor."
                .to_string(),
        ),
        _ => {}
    }

    if out.is_empty() {
        out.push(
            "Keep your current routine: consistent sleep and wake times are working for you."
                .to_string(),
        );
    }

    out
}

/// `23.0` → `"23:00"`, `6.5` → `"06:30"`
fn clock(hour: f64) -> String {
    let total_minutes = (hour * 60.0).round() as i64;
    format!("{:02}:{:02}", total_minutes / 60 % 24, total_minutes % 60)
}
