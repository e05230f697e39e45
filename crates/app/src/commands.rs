use anyhow::{Context, Result, bail};
use chrono::Datelike;
use epsilon_core::catalog::ResourceFilter;
use epsilon_core::model::{
    CurrentUser, MeetingDraft, MeetingFilter, MeetingId, Resource, ResourceId, ResourceType,
    Theme, UserPatch,
};
use epsilon_core::{NotificationTrigger, ProgressEvent, QuizSession};
use serde::Serialize;
use serde_json::{Value, json};
use services::{AppServices, CompletionOutcome, PersistenceStatus};
use tracing::warn;

use crate::Commands;
use crate::render;

/// One CLI invocation: the assembled services, the output mode and the
/// session's notification state.
pub struct Ctx {
    app: AppServices,
    json: bool,
    trigger: NotificationTrigger,
}

impl Ctx {
    pub fn new(app: AppServices, json: bool) -> Self {
        Self {
            app,
            json,
            trigger: NotificationTrigger::new(),
        }
    }

    pub async fn run(mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Progress => self.progress().await,
            Commands::Profile {
                name,
                theme,
                logout,
            } => self.profile(name, theme, logout).await,
            Commands::Catalog {
                kind,
                category,
                difficulty,
                search,
            } => {
                let filter = ResourceFilter {
                    kind,
                    category,
                    difficulty,
                    ..ResourceFilter::default()
                }
                .search(search.unwrap_or_default());
                self.catalog(&filter).await
            }
            Commands::Lesson { id, complete } => {
                let lesson = self.app.catalog().lesson(id).await?;
                self.show_resource(&lesson, complete).await
            }
            Commands::Video { id, complete } => {
                let video = self.app.catalog().video(id).await?;
                self.show_resource(&video, complete).await
            }
            Commands::Download { id, out } => self.download(id, &out).await,
            Commands::Quiz { id, answers } => self.quiz(id, answers).await,
            Commands::Meetings {
                category,
                meeting_type,
                date,
                limit,
            } => {
                let filter = MeetingFilter {
                    category,
                    meeting_type,
                };
                let meetings = self.app.meetings();
                let list = match date {
                    Some(day) => meetings.on_date(day, &filter).await?,
                    None => {
                        meetings
                            .upcoming(self.app.clock().today(), &filter, limit)
                            .await?
                    }
                };
                self.emit(&list, || render::meetings(&list))
            }
            Commands::MeetingCreate {
                title,
                teacher,
                teacher_title,
                description,
                date,
                time,
                duration,
                link,
                category,
                meeting_type,
                recurring,
            } => {
                let mut draft = MeetingDraft::new(title, teacher, date, time, link);
                draft.teacher_title = teacher_title;
                draft.description = description;
                draft.duration_minutes = duration;
                draft.category = category;
                draft.meeting_type = meeting_type;
                draft.recurring = recurring;
                let meeting = self.app.meetings().create_meeting(draft).await?;
                let list = [meeting];
                self.emit(&list[0], || render::meetings(&list))
            }
            Commands::Register { id } => self.register(id, true).await,
            Commands::Unregister { id } => self.register(id, false).await,
            Commands::Dashboard => {
                let user = self.require_user().await?;
                let overview = self
                    .app
                    .dashboard()
                    .overview(&user, self.app.clock().today())
                    .await?;
                self.emit(&overview, || render::dashboard(&overview))
            }
            Commands::Calendar {
                year,
                month,
                category,
                meeting_type,
            } => {
                let today = self.app.clock().today();
                let view = self
                    .app
                    .meetings()
                    .month_view(
                        year.unwrap_or(today.year()),
                        month.unwrap_or(today.month()),
                        &MeetingFilter {
                            category,
                            meeting_type,
                        },
                    )
                    .await?;
                self.emit(&view, || render::month(&view))
            }
            Commands::Seed => {
                let report = self.app.seed_demo().await?;
                let value = json!({ "resources": report.resources, "meetings": report.meetings });
                self.emit(&value, || {
                    format!(
                        "Seeded {} resources and {} meetings.",
                        report.resources, report.meetings
                    )
                })
            }
        }
    }

    fn emit<T>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text().trim_end());
        }
        Ok(())
    }

    async fn require_user(&self) -> Result<CurrentUser> {
        match self.app.current_user().await? {
            Some(user) => Ok(user),
            None => bail!("{}", self.app.auth().redirect_to_login().message),
        }
    }

    async fn progress(&self) -> Result<()> {
        let user = self.require_user().await?;
        let profile = self.app.progress().profile(&user).await?;
        self.emit(&profile, || render::profile(&profile))
    }

    async fn profile(
        &self,
        name: Option<String>,
        theme: Option<Theme>,
        logout: bool,
    ) -> Result<()> {
        let auth = self.app.auth();
        if logout {
            auth.logout().await?;
            return self.emit(&json!({ "signed_in": false }), || {
                "Signed out. Drop --user (or unset EPSILON_USER_EMAIL) to stay signed out."
                    .to_string()
            });
        }
        let user = if name.is_some() || theme.is_some() {
            auth.update_me(UserPatch {
                full_name: name,
                theme,
            })
            .await?
        } else {
            self.require_user().await?
        };
        self.emit(&user, || render::user(&user))
    }

    async fn catalog(&self, filter: &ResourceFilter) -> Result<()> {
        let catalog = self.app.catalog();
        let resources = catalog.filter(filter).await?;
        let statuses = match self.app.current_user().await? {
            Some(user) => Some(catalog.statuses_for(&user.email, &resources).await?),
            None => None,
        };
        if self.json {
            let rows: Vec<_> = resources
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    let status = statuses.as_ref().and_then(|s| s.get(i));
                    json!({ "resource": r, "status": status })
                })
                .collect();
            return self.emit(&rows, String::new);
        }
        self.emit(&(), || render::catalog(&resources, statuses.as_deref()))
    }

    async fn show_resource(&mut self, resource: &Resource, complete: bool) -> Result<()> {
        if !complete {
            return self.emit(resource, || render::resource(resource));
        }
        let user = self.require_user().await?;
        let outcome = self
            .app
            .progress()
            .complete_resource(&user.email, resource)
            .await?;
        let events = self.observe(&outcome);
        self.emit(
            &completion_report("resource", resource, Some(&outcome), &events),
            || render::resource(resource) + &render::completion(&outcome, &events),
        )
    }

    async fn download(&mut self, id: ResourceId, out: &std::path::Path) -> Result<()> {
        let catalog = self.app.catalog();
        let download = catalog.download(id).await?;
        let lessons = catalog
            .filter(
                &ResourceFilter::default()
                    .kind(ResourceType::Lesson)
                    .category(download.category()),
            )
            .await?;

        std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
        let path = out.join(render::handout_file_name(&download));
        std::fs::write(&path, render::handout(&download, lessons.first()))
            .with_context(|| format!("writing {}", path.display()))?;

        let mut outcome = None;
        if let Some(user) = self.app.current_user().await? {
            outcome = Some(
                self.app
                    .progress()
                    .complete_resource(&user.email, &download)
                    .await?,
            );
        }
        let events = outcome.as_ref().map(|o| self.observe(o)).unwrap_or_default();
        self.emit(
            &completion_report("saved", &path, outcome.as_ref(), &events),
            || {
                let mut text = format!("Saved {}\n", path.display());
                if let Some(outcome) = &outcome {
                    text.push_str(&render::completion(outcome, &events));
                }
                text
            },
        )
    }

    async fn quiz(&mut self, id: ResourceId, answers: Option<Vec<usize>>) -> Result<()> {
        let quizzes = self.app.quizzes();
        let mut session = quizzes.start(id).await?;
        let Some(answers) = answers else {
            return self.emit(session.questions(), || render::quiz_questions(&session));
        };
        answer_all(&mut session, &answers)?;

        let user = self.app.current_user().await?;
        let submission = quizzes.submit(&mut session, user.as_ref()).await?;
        let result = &submission.result;
        let (saved, note, completion) = match &submission.persistence {
            PersistenceStatus::Anonymous => (
                false,
                format!("\n{}", self.app.auth().redirect_to_login().message),
                None,
            ),
            PersistenceStatus::Saved { completion, .. } => (true, String::new(), Some(completion)),
            PersistenceStatus::Failed(e) => {
                warn!(quiz = %id, error = %e, "quiz result not saved");
                (false, format!("\nYour result could not be saved: {e}"), None)
            }
        };
        let events = completion.map(|c| self.observe(c)).unwrap_or_default();
        let mut report = completion_report("result", result, completion, &events);
        report["saved"] = json!(saved);
        self.emit(&report, || {
            let mut text = render::quiz_result(result);
            match completion {
                Some(c) => text.push_str(&render::completion(c, &events)),
                None => text.push_str(&note),
            }
            text
        })
    }

    async fn register(&self, id: MeetingId, join: bool) -> Result<()> {
        let user = self.require_user().await?;
        let meetings = self.app.meetings();
        let changed = if join {
            meetings.register(&user.email, id).await?
        } else {
            meetings.unregister(&user.email, id).await?
        };
        let message = match (join, changed) {
            (true, true) => "Registered.",
            (true, false) => "Already registered.",
            (false, true) => "Registration cancelled.",
            (false, false) => "You were not registered.",
        };
        self.emit(&json!({ "meeting": id, "changed": changed }), || {
            message.to_string()
        })
    }

    fn observe(&mut self, outcome: &CompletionOutcome) -> Vec<ProgressEvent> {
        self.trigger
            .observe(outcome.before.as_ref(), Some(&outcome.after))
    }
}

/// JSON body for a command that may complete a resource: the command's own
/// payload under `key`, the completion outcome and the events it fired.
fn completion_report<T>(
    key: &str,
    subject: &T,
    completion: Option<&CompletionOutcome>,
    events: &[ProgressEvent],
) -> Value
where
    T: Serialize + ?Sized,
{
    let mut report = json!({ "completion": completion, "events": events });
    report[key] = json!(subject);
    report
}

fn answer_all(session: &mut QuizSession, answers: &[usize]) -> Result<()> {
    if answers.len() > session.total() {
        bail!(
            "{} answers given for {} questions",
            answers.len(),
            session.total()
        );
    }
    for (question, &option) in answers.iter().enumerate() {
        session.go_to(question)?;
        session.select_answer(option)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use epsilon_core::model::{ProgressRecord, UserEmail};

    fn outcome() -> CompletionOutcome {
        let email = UserEmail::new("ada@example.com").unwrap();
        let before = ProgressRecord::first_activity(email);
        let mut after = before.clone();
        after.record_completion(ResourceType::Lesson, ResourceId::new(1), 100);
        CompletionOutcome {
            newly_completed: true,
            xp_awarded: 100,
            before: Some(before),
            after,
        }
    }

    #[test]
    fn completion_report_carries_fired_events() {
        let events = [ProgressEvent::XpGained { amount: 100 }];
        let report = completion_report("resource", "Budgeting", Some(&outcome()), &events);

        assert_eq!(report["resource"], "Budgeting");
        assert_eq!(report["completion"]["xp_awarded"], 100);
        assert_eq!(report["events"][0]["event"], "xp_gained");
        assert_eq!(report["events"][0]["amount"], 100);
    }

    #[test]
    fn completion_report_without_a_user_has_no_events() {
        let report = completion_report("saved", "out/plan.md", None, &[]);

        assert_eq!(report["saved"], "out/plan.md");
        assert!(report["completion"].is_null());
        assert_eq!(report["events"], json!([]));
    }
}
