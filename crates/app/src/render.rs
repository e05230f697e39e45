//! Plain-text views for the terminal.

use std::fmt::Write as _;

use epsilon_core::ProgressSummary;
use epsilon_core::catalog::youtube_id;
use epsilon_core::model::{CurrentUser, Meeting, Resource, ResourceKind};
use epsilon_core::{ProgressEvent, QuizResult, QuizSession};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use services::{CompletionOutcome, DashboardOverview, MonthView, ProfileView, ResourceStatus};

/// Flatten markdown to terminal text: headings underlined, list
/// items bulleted, emphasis dropped.
#[must_use]
pub fn markdown_to_text(input: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let mut out = String::new();
    let mut heading_start = None;
    let mut list_depth = 0_usize;
    for event in Parser::new_ext(input, options) {
        match event {
            Event::Start(Tag::Heading { .. }) => heading_start = Some(out.len()),
            Event::End(TagEnd::Heading(level)) => {
                let width = heading_start
                    .take()
                    .map_or(0, |start| out[start..].chars().count());
                let rule = if level == HeadingLevel::H1 { '=' } else { '-' };
                out.push('\n');
                out.extend(std::iter::repeat_n(rule, width));
                out.push_str("\n\n");
            }
            Event::Start(Tag::List(_)) => list_depth += 1,
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                out.push_str(&"  ".repeat(list_depth.saturating_sub(1)));
                out.push_str("• ");
            }
            Event::End(TagEnd::Item) => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Event::End(TagEnd::Paragraph) => {
                out.push('\n');
                if list_depth == 0 {
                    out.push('\n');
                }
            }
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push('\n'),
            _ => {}
        }
    }
    out.trim_end().to_string()
}

pub fn summary(name: &str, s: &ProgressSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{name}");
    let _ = writeln!(
        out,
        "Level {}  ·  {} XP  ·  {} XP to level {}  ({}%)",
        s.level,
        s.xp,
        s.xp_to_next_level,
        s.level + 1,
        s.level_progress_percent
    );
    let _ = writeln!(
        out,
        "Completed {}  ·  Downloads {}  ·  Streak {} day(s)",
        s.completed_count, s.downloads, s.streak_days
    );
    let _ = writeln!(out, "Badges:");
    for badge in &s.badges {
        let _ = writeln!(out, "  {} ({})", badge.title(), badge.description());
    }
    out
}

pub fn profile(p: &ProfileView) -> String {
    let mut out = summary(p.user.display_name(), &p.summary);
    let _ = writeln!(
        out,
        "Lessons {}  ·  Quizzes {}  ·  Videos {}",
        p.lessons, p.quizzes, p.videos
    );
    let _ = writeln!(
        out,
        "Quizzes taken {}  ·  Avg Quiz {}%",
        p.quiz_stats.attempts, p.quiz_stats.average_percent
    );
    out
}

pub fn user(u: &CurrentUser) -> String {
    format!("{}\n{}\nTheme: {}\n", u.display_name(), u.email, u.theme)
}

pub fn completion(outcome: &CompletionOutcome, fired: &[ProgressEvent]) -> String {
    if !outcome.newly_completed {
        return "\nAlready completed; no XP awarded.\n".to_string();
    }
    let mut out = String::from("\n");
    if outcome.before.is_none() {
        let _ = writeln!(out, "Welcome! +{} XP", outcome.xp_awarded);
    }
    out.push_str(&events(fired));
    out
}

pub fn catalog(resources: &[Resource], statuses: Option<&[ResourceStatus]>) -> String {
    if resources.is_empty() {
        return "No resources match.".into();
    }
    let mut out = String::new();
    for (i, r) in resources.iter().enumerate() {
        let status = statuses.and_then(|s| s.get(i));
        let mark = if status.is_some_and(|s| s.completed) {
            "✓"
        } else {
            " "
        };
        let _ = write!(
            out,
            "{mark} {:>3}  {:<9} {:<38} {} / {}  +{} XP",
            r.id().value(),
            r.resource_type().as_str(),
            r.title(),
            r.category().label(),
            r.difficulty(),
            r.xp_reward()
        );
        if let Some(score) = status.and_then(|s| s.quiz_score.as_deref()) {
            let _ = write!(out, "  last {score}");
        }
        out.push('\n');
    }
    out
}

pub fn resource(r: &Resource) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", r.title());
    let _ = writeln!(
        out,
        "{} · {} · {}{}",
        r.resource_type(),
        r.category().label(),
        r.difficulty(),
        r.duration_minutes()
            .map(|m| format!(" · {m} min"))
            .unwrap_or_default()
    );
    if let Some(d) = r.description() {
        let _ = writeln!(out, "\n{d}");
    }
    out.push('\n');
    match r.kind() {
        ResourceKind::Lesson { sections, sources } => {
            for (i, section) in sections.iter().enumerate() {
                let _ = writeln!(out, "{}. {}\n", i + 1, section.title);
                let _ = writeln!(out, "{}\n", markdown_to_text(&section.content));
            }
            if !sources.is_empty() {
                let _ = writeln!(out, "Sources");
                for (i, s) in sources.iter().enumerate() {
                    let _ = writeln!(out, "  [{}] {s}", i + 1);
                }
            }
        }
        ResourceKind::Video { url } => {
            let _ = writeln!(out, "{url}");
            if let Some(id) = youtube_id(url) {
                let _ = writeln!(out, "embed: https://www.youtube.com/embed/{id}");
            }
        }
        ResourceKind::Download { file_name } => {
            let _ = writeln!(out, "file: {file_name}");
        }
        ResourceKind::Quiz { questions } => {
            let _ = writeln!(out, "{} questions", questions.len());
        }
    }
    out
}

/// Markdown handout for a download, built from the lesson content of the
/// same category when there is one.
pub fn handout(download: &Resource, lesson: Option<&Resource>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", download.title());
    let _ = writeln!(out, "**{}**\n", download.category().label().to_uppercase());
    if let Some(d) = download.description() {
        let _ = writeln!(out, "_{d}_\n");
    }
    if let Some(ResourceKind::Lesson { sections, sources }) = lesson.map(Resource::kind) {
        for section in sections {
            let _ = writeln!(out, "## {}\n\n{}\n", section.title, section.content);
        }
        if !sources.is_empty() {
            let _ = writeln!(out, "## Sources & References\n");
            for (i, s) in sources.iter().enumerate() {
                let _ = writeln!(out, "{}. {s}", i + 1);
            }
            out.push('\n');
        }
    }
    out.push_str("---\n© Epsilon Learning\n");
    out
}

/// File name for a handout: non-alphanumerics become underscores.
pub fn handout_file_name(r: &Resource) -> String {
    let stem: String = r
        .title()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}.md")
}

pub fn quiz_questions(session: &QuizSession) -> String {
    let mut out = String::new();
    for (i, q) in session.questions().iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, q.question());
        for (j, option) in q.options().iter().enumerate() {
            let _ = writeln!(out, "   {j}) {option}");
        }
    }
    let _ = writeln!(
        out,
        "\nAnswer with --answers followed by {} comma-separated option numbers.",
        session.total()
    );
    out
}

pub fn quiz_result(result: &QuizResult) -> String {
    let mut out = String::new();
    let verdict = if result.passed { "Passed" } else { "Keep practicing" };
    let _ = writeln!(
        out,
        "{verdict}: {}/{} ({}%)\n",
        result.score, result.total, result.percentage
    );
    for (i, review) in result.review.iter().enumerate() {
        let mark = if review.is_correct() { "✓" } else { "✗" };
        let _ = writeln!(out, "{mark} {}. {}", i + 1, review.question);
        if !review.is_correct() {
            let _ = writeln!(out, "    correct answer: {}", review.correct_answer);
        }
        if !review.explanation.is_empty() {
            let _ = writeln!(out, "    {}", review.explanation);
        }
    }
    out
}

pub fn events(events: &[ProgressEvent]) -> String {
    events
        .iter()
        .map(|e| format!("★ {e}\n"))
        .collect()
}

pub fn meetings(meetings: &[Meeting]) -> String {
    if meetings.is_empty() {
        return "No meetings scheduled.".into();
    }
    let mut out = String::new();
    for m in meetings {
        let _ = writeln!(
            out,
            "{:>3}  {} {}  {:<32} {} ({} min, {})",
            m.id.value(),
            m.date,
            m.time.format("%H:%M"),
            m.title,
            m.meeting_type.label(),
            m.duration_minutes,
            m.category.label()
        );
        let teacher = match &m.teacher_title {
            Some(title) => format!("{} · {title}", m.teacher_name),
            None => m.teacher_name.clone(),
        };
        let _ = writeln!(out, "     {teacher}  {}", m.meeting_link.as_str());
    }
    out
}

pub fn month(view: &MonthView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:04}-{:02}", view.year, view.month);
    let _ = writeln!(out, " Su  Mo  Tu  We  Th  Fr  Sa");
    for week in view.cells.chunks(7) {
        for cell in week {
            match cell {
                Some(day) => {
                    let marker = if view.meetings_on(*day).is_empty() { ' ' } else { '*' };
                    let _ = write!(out, " {day:>2}{marker}");
                }
                None => out.push_str("    "),
            }
        }
        out.push('\n');
    }
    for (day, meetings) in &view.meetings {
        for m in meetings {
            let _ = writeln!(out, "{day:>3}: {} {}", m.time.format("%H:%M"), m.title);
        }
    }
    out
}

pub fn dashboard(d: &DashboardOverview) -> String {
    let mut out = format!("Welcome back, {}!\n\n", d.greeting_name);
    out.push_str(&summary("Your progress", &d.summary));
    let _ = writeln!(out, "Catalog completion: {}%\n", d.completion_percent);
    let _ = writeln!(out, "Featured");
    out.push_str(&catalog(&d.featured, None));
    let _ = writeln!(out, "\nYour upcoming sessions");
    out.push_str(&meetings(&d.upcoming_meetings));
    out
}
