use crate::resources::{Resource, CRISIS_LINES, READING, SUPPORT_EMAIL};
use anyhow::Result;
use moodtrack::models::{
    DashboardSummary, EmotionStats, EntryRecord, Mood, RiskAssessment, RiskCategory, UserProfile,
};
use moodtrack::settings::AppSettings;
use std::io::Write;
use termcolor::{Color, ColorSpec, WriteColor};

fn mood_color(mood: Mood) -> Color {
    match mood {
        Mood::Happy => Color::Green,
        Mood::Sad => Color::Blue,
        Mood::Angry => Color::Red,
        Mood::Anxious => Color::Yellow,
        Mood::Neutral => Color::White,
    }
}

fn risk_color(risk: RiskCategory) -> Color {
    match risk {
        RiskCategory::Low => Color::Green,
        RiskCategory::Moderate => Color::Yellow,
        RiskCategory::High => Color::Red,
    }
}

fn pp_mood<W: WriteColor>(out: &mut W, mood: Mood) -> Result<()> {
    out.set_color(
        ColorSpec::new()
            .set_fg(Some(mood_color(mood)))
            .set_bold(true),
    )?;
    write!(out, "{:<8}", mood.as_str())?;
    out.reset()?;
    Ok(())
}

fn pp_risk<W: WriteColor>(out: &mut W, risk: RiskCategory, score: Option<f64>) -> Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(risk_color(risk))))?;
    match score {
        Some(s) => write!(out, "{} risk ({:.2})", risk, s)?,
        None => write!(out, "{} risk", risk)?,
    }
    out.reset()?;
    Ok(())
}

fn pp_heading<W: WriteColor>(out: &mut W, text: &str) -> Result<()> {
    out.set_color(ColorSpec::new().set_bold(true).set_underline(true))?;
    writeln!(out, "{}", text)?;
    out.reset()?;
    Ok(())
}

fn pp_recommendations<W: WriteColor>(out: &mut W, recommendations: &[String]) -> Result<()> {
    if recommendations.is_empty() {
        return Ok(());
    }
    out.set_color(ColorSpec::new().set_dimmed(true).set_italic(true))?;
    writeln!(out, "  suggestions:")?;
    out.reset()?;
    for rec in recommendations {
        writeln!(out, "   - {}", rec)?;
    }
    Ok(())
}

pub fn pp_entry<W: WriteColor>(out: &mut W, entry: &EntryRecord) -> Result<()> {
    out.set_color(ColorSpec::new().set_dimmed(true))?;
    write!(out, "#{:<5} {} ", entry.id, entry.date)?;
    out.reset()?;
    pp_mood(out, entry.mood)?;
    write!(
        out,
        " anxiety {}/5  energy {}/5  appetite {}/5  sleep {:.1}h",
        entry.anxiety_level, entry.energy_level, entry.appetite, entry.sleep_hours
    )?;
    if let Some(risk) = entry.risk_category {
        write!(out, "  ")?;
        pp_risk(out, risk, entry.risk_score)?;
    }
    writeln!(out)?;
    if let Some(text) = &entry.journal_text {
        if !text.is_empty() {
            out.set_color(ColorSpec::new().set_italic(true))?;
            writeln!(out, "  \"{:.70}\"", text)?;
            out.reset()?;
        }
    }
    pp_recommendations(out, &entry.recommendations)?;
    Ok(())
}

pub fn pp_entries<W: WriteColor>(out: &mut W, entries: &[EntryRecord]) -> Result<()> {
    if entries.is_empty() {
        writeln!(out, "no entries in this period; try `moodtrack checkin`")?;
    }
    for entry in entries {
        pp_entry(out, entry)?;
    }
    Ok(())
}

pub fn pp_risk_assessment<W: WriteColor>(out: &mut W, ra: &RiskAssessment) -> Result<()> {
    out.set_color(ColorSpec::new().set_dimmed(true))?;
    write!(out, "{} ", ra.date)?;
    out.reset()?;
    pp_risk(out, ra.risk_category, Some(ra.risk_score))?;
    writeln!(out)?;
    if let Some(factors) = ra.contributing_factors.as_object() {
        let mut factors: Vec<(&String, f64)> = factors
            .iter()
            .filter_map(|(k, v)| v.as_f64().map(|f| (k, f)))
            .collect();
        factors.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (name, weight) in factors {
            writeln!(out, "  {:<16} {:.2}", name, weight)?;
        }
    }
    pp_recommendations(out, &ra.recommendations)?;
    Ok(())
}

pub fn pp_dashboard<W: WriteColor>(out: &mut W, summary: &DashboardSummary) -> Result<()> {
    pp_heading(out, "Today")?;
    match &summary.today_entry {
        Some(entry) => pp_entry(out, entry)?,
        None => writeln!(out, "no check-in yet today; try `moodtrack checkin`")?,
    }
    writeln!(
        out,
        "streak: {} day{}",
        summary.streak,
        if summary.streak == 1 { "" } else { "s" }
    )?;

    if !summary.week_moods.is_empty() {
        writeln!(out)?;
        pp_heading(out, "This week")?;
        for day in summary.week_moods.iter() {
            write!(out, "{} ", day.date)?;
            pp_mood(out, day.mood)?;
            writeln!(out, " {:.2}", day.risk_score)?;
        }
    }

    if let Some(ra) = &summary.recent_assessment {
        writeln!(out)?;
        pp_heading(out, "Latest assessment")?;
        pp_risk_assessment(out, ra)?;
        if ra.risk_category == RiskCategory::High {
            writeln!(out)?;
            pp_crisis_lines(out)?;
        }
    }
    Ok(())
}

fn pp_bar<W: WriteColor>(out: &mut W, label: &str, value: f64, max: f64) -> Result<()> {
    let width = if max > 0.0 {
        ((value / max) * 20.0).round().clamp(0.0, 20.0) as usize
    } else {
        0
    };
    writeln!(out, "  {:<12} {:<20} {:.2}", label, "#".repeat(width), value)?;
    Ok(())
}

pub fn pp_stats<W: WriteColor>(out: &mut W, stats: &EmotionStats, days: u32) -> Result<()> {
    pp_heading(out, &format!("Last {} days ({} entries)", days, stats.entries_count))?;
    if stats.entries_count == 0 {
        writeln!(out, "nothing recorded yet")?;
        return Ok(());
    }
    pp_bar(out, "anxiety", stats.avg_anxiety, 5.0)?;
    pp_bar(out, "energy", stats.avg_energy, 5.0)?;
    pp_bar(out, "appetite", stats.avg_appetite, 5.0)?;
    pp_bar(out, "sleep (h)", stats.avg_sleep, 12.0)?;

    writeln!(out)?;
    pp_heading(out, "Moods")?;
    let total = stats.mood_distribution.values().sum::<u32>() as f64;
    for mood in Mood::ALL {
        let count = stats
            .mood_distribution
            .get(mood.as_str())
            .copied()
            .unwrap_or(0);
        out.set_color(ColorSpec::new().set_fg(Some(mood_color(mood))))?;
        pp_bar(out, mood.as_str(), count as f64, total)?;
        out.reset()?;
    }

    if !stats.risk_trend.is_empty() {
        writeln!(out)?;
        pp_heading(out, "Risk trend")?;
        for point in stats.risk_trend.iter() {
            pp_bar(out, &point.date, point.risk_score, 1.0)?;
        }
    }
    Ok(())
}

pub fn pp_profile<W: WriteColor>(out: &mut W, profile: &UserProfile) -> Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
    writeln!(out, "@{}", profile.username)?;
    out.reset()?;
    let missing = "not provided".to_string();
    writeln!(
        out,
        "  email:          {}",
        if profile.email.is_empty() {
            &missing
        } else {
            &profile.email
        }
    )?;
    match profile.age {
        Some(age) => writeln!(out, "  age:            {} years", age)?,
        None => writeln!(out, "  age:            {}", missing)?,
    }
    writeln!(
        out,
        "  delivery date:  {}",
        profile.delivery_date.as_ref().unwrap_or(&missing)
    )?;
    writeln!(
        out,
        "  support system: {}",
        profile.support_system.as_ref().unwrap_or(&missing)
    )?;
    Ok(())
}

pub fn pp_settings<W: WriteColor>(out: &mut W, settings: &AppSettings) -> Result<()> {
    let rows = [
        ("notifications", settings.notifications),
        ("daily-reminders", settings.daily_reminders),
        ("weekly-reports", settings.weekly_reports),
        ("dark-mode", settings.dark_mode),
        ("data-sharing", settings.data_sharing),
    ];
    for (name, on) in rows {
        write!(out, "  {:<16} ", name)?;
        if on {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            writeln!(out, "on")?;
        } else {
            out.set_color(ColorSpec::new().set_dimmed(true))?;
            writeln!(out, "off")?;
        }
        out.reset()?;
    }
    Ok(())
}

fn pp_resource_list<W: WriteColor>(out: &mut W, resources: &[Resource]) -> Result<()> {
    for r in resources {
        out.set_color(ColorSpec::new().set_bold(true))?;
        write!(out, "  {}", r.title)?;
        out.reset()?;
        if let Some(contact) = r.contact {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            write!(out, "  ({})", contact)?;
            out.reset()?;
        }
        writeln!(out)?;
        out.set_color(ColorSpec::new().set_dimmed(true))?;
        writeln!(out, "    {}", r.description)?;
        out.reset()?;
    }
    Ok(())
}

/// Shown whenever the server reports high risk
pub fn pp_crisis_lines<W: WriteColor>(out: &mut W) -> Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
    writeln!(out, "You don't have to go through this alone. Support is available right now:")?;
    out.reset()?;
    pp_resource_list(out, CRISIS_LINES)
}

pub fn pp_resources<W: WriteColor>(out: &mut W) -> Result<()> {
    pp_heading(out, "If you need help now")?;
    pp_resource_list(out, CRISIS_LINES)?;
    writeln!(out)?;
    pp_heading(out, "Reading")?;
    pp_resource_list(out, READING)?;
    writeln!(out)?;
    writeln!(out, "questions about the app: {}", SUPPORT_EMAIL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use termcolor::NoColor;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut NoColor<Vec<u8>>) -> Result<()>,
    {
        let mut out = NoColor::new(vec![]);
        f(&mut out).unwrap();
        String::from_utf8(out.into_inner()).unwrap()
    }

    #[test]
    fn test_pp_entry() {
        let entry: EntryRecord = serde_json::from_value(json!({
            "id": 12,
            "date": "2024-03-09",
            "mood": "sad",
            "anxiety_level": 4,
            "sleep_hours": 4.5,
            "energy_level": 2,
            "appetite": 2,
            "journal_text": "rough night",
            "risk_score": 0.71,
            "risk_category": "high",
            "created_at": null,
            "recommendations": ["Try to get at least 7-8 hours of sleep"]
        }))
        .unwrap();
        let text = render(|out| pp_entry(out, &entry));
        assert!(text.starts_with("#12    2024-03-09 sad "));
        assert!(text.contains("sleep 4.5h"));
        assert!(text.contains("high risk (0.71)"));
        assert!(text.contains("\"rough night\""));
        assert!(text.contains("   - Try to get at least 7-8 hours of sleep"));
    }

    #[test]
    fn test_pp_dashboard_high_risk_shows_crisis_lines() {
        let summary: DashboardSummary = serde_json::from_value(json!({
            "today_entry": null,
            "recent_assessment": {
                "id": 3,
                "date": "2024-03-09",
                "risk_category": "high",
                "risk_score": 0.8,
                "contributing_factors": {"sleep_hours": 0.4, "mood": 0.3},
                "recommendations": [],
                "created_at": null
            },
            "streak": 1,
            "week_moods": []
        }))
        .unwrap();
        let text = render(|out| pp_dashboard(out, &summary));
        assert!(text.contains("no check-in yet today"));
        assert!(text.contains("streak: 1 day\n"));
        assert!(text.contains("988"));
        // heavier factors first
        assert!(text.find("  sleep_hours ").unwrap() < text.find("  mood ").unwrap());
    }

    #[test]
    fn test_pp_stats_empty() {
        let stats: EmotionStats = serde_json::from_value(json!({
            "avg_anxiety": 0,
            "avg_sleep": 0,
            "avg_energy": 0,
            "avg_appetite": 0,
            "mood_distribution": {},
            "risk_trend": [],
            "entries_count": 0
        }))
        .unwrap();
        let text = render(|out| pp_stats(out, &stats, 30));
        assert!(text.contains("Last 30 days (0 entries)"));
        assert!(text.contains("nothing recorded yet"));
    }

    #[test]
    fn test_pp_settings() {
        let text = render(|out| pp_settings(out, &AppSettings::default()));
        assert!(text.contains("notifications    on"));
        assert!(text.contains("dark-mode        off"));
    }
}
