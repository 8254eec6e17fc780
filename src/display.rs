use crate::{
    clone::{CloneOutcome, CloneSummary},
    github::RepositoryDescriptor,
};
use chrono::{DateTime, TimeZone, Utc};
use console::style;
use std::{borrow::Cow, fmt};

const DESCRIPTION_LEN: usize = 40;
const LANG_NAME_LEN: usize = 10;

/// Cuts `text` to at most `threshold` characters, marking the cut with `..`.
///
/// Line breaks and tabs become spaces so the result stays on one table cell.
pub fn ellipsize(text: &str, threshold: usize) -> Cow<'_, str> {
    debug_assert!(threshold > 2);
    let flatten = |c: char| if c == '\n' || c == '\t' { ' ' } else { c };
    if text.chars().count() <= threshold {
        if text.contains(&['\n', '\t'][..]) {
            text.chars().map(flatten).collect::<String>().into()
        } else {
            text.into()
        }
    } else {
        let text: String = text.chars().map(flatten).take(threshold - 2).collect();
        let mut text = text.trim_end().to_owned();
        text.push_str("..");
        text.into()
    }
}

#[cfg(test)]
#[test]
fn test_ellipsize() {
    use quickcheck::{quickcheck, TestResult};

    fn has_max_length_threshold(text: String, threshold: usize) -> TestResult {
        if threshold < 3 {
            return TestResult::discard();
        }
        TestResult::from_bool(ellipsize(&text, threshold).chars().count() <= threshold)
    }

    quickcheck(has_max_length_threshold as fn(_, _) -> TestResult);

    fn has_ellipsis_at_the_end(text: String, threshold: usize) -> TestResult {
        if threshold < 3 {
            return TestResult::discard();
        }
        if text.chars().count() <= threshold {
            return TestResult::discard();
        }
        TestResult::from_bool(ellipsize(&text, threshold).ends_with(".."))
    }

    quickcheck(has_ellipsis_at_the_end as fn(_, _) -> TestResult);

    assert_eq!(ellipsize("hello", 10), "hello");
    assert_eq!(ellipsize("hello world", 8), "hello..");
}

/// Relative time from now.
pub trait RelativeFromNow {
    fn relative_from_now(&self) -> Since;
}

impl<T> RelativeFromNow for DateTime<T>
where
    T: TimeZone,
{
    fn relative_from_now(&self) -> Since {
        let duration = Utc::now().signed_duration_since(self.clone());
        Since(duration)
    }
}

#[derive(PartialEq, Copy, Clone, Debug)]
pub struct Since(chrono::Duration);

impl fmt::Display for Since {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.0.num_days();
        match days {
            _ if days < 1 => {
                let hours = self.0.num_hours();
                let minutes = self.0.num_minutes();
                if hours >= 1 {
                    write!(f, "{hours} hours ago")
                } else if minutes >= 1 {
                    write!(f, "{minutes} minutes ago")
                } else {
                    write!(f, "just now")
                }
            }
            _ if days < 7 => write!(f, "this week"),
            _ if days < 30 => write!(f, "this month"),
            _ if days < 365 => write!(f, "this year"),
            _ => {
                let years = days / 365;
                if years == 1 {
                    write!(f, "{years} year ago")
                } else {
                    write!(f, "{years} years ago")
                }
            }
        }
    }
}

#[cfg(test)]
#[test]
fn test_since() {
    use chrono::Duration;

    assert_eq!(Since(Duration::seconds(20)).to_string(), "just now");
    assert_eq!(Since(Duration::minutes(5)).to_string(), "5 minutes ago");
    assert_eq!(Since(Duration::hours(3)).to_string(), "3 hours ago");
    assert_eq!(Since(Duration::days(3)).to_string(), "this week");
    assert_eq!(Since(Duration::days(400)).to_string(), "1 year ago");
    assert_eq!(Since(Duration::days(800)).to_string(), "2 years ago");
}

/// One tab separated line of the repository listing.
#[derive(Debug)]
pub struct RepositoryRow<'a>(pub &'a RepositoryDescriptor);

impl RepositoryRow<'_> {
    pub const HEADER: &'static str = "VISIBILITY\tNAME\tDESCRIPTION\tPUSHED\tLANGUAGE\tATTRS";
}

impl fmt::Display for RepositoryRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repo = self.0;

        let visibility = if repo.private { "private" } else { "public" };
        let description = repo.description.as_deref().unwrap_or_default();
        let pushed = repo
            .pushed_at
            .as_ref()
            .map(|x| x.relative_from_now().to_string())
            .unwrap_or_default();
        let lang = repo.language.as_deref().unwrap_or_default();

        let mut attrs = Vec::new();
        if repo.fork {
            attrs.push("fork");
        }
        if repo.archived {
            attrs.push("archived");
        }

        write!(
            f,
            "{visibility}\t{name}\t{description}\t{pushed}\t{lang}\t{attrs}",
            name = repo.name,
            description = ellipsize(description, DESCRIPTION_LEN),
            lang = ellipsize(lang, LANG_NAME_LEN),
            attrs = attrs.join(", "),
        )
    }
}

/// Progress line of one repository in a bulk clone.
#[derive(Debug)]
pub struct OutcomeLine<'a>(pub &'a RepositoryDescriptor, pub &'a CloneOutcome);

impl fmt::Display for OutcomeLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let OutcomeLine(repo, outcome) = self;
        let mark = match outcome {
            CloneOutcome::Cloned => style(format!("{:>5}", "ok")).green(),
            CloneOutcome::Skipped(_) => style(format!("{:>5}", "skip")).yellow(),
            CloneOutcome::Failed(_) => style(format!("{:>5}", "fail")).red().bold(),
            CloneOutcome::Aborted => style(format!("{:>5}", "abort")).dim(),
        };
        write!(f, "[{mark}] {name}: {outcome}", name = repo.name)
    }
}

/// Final line of a bulk clone.
#[derive(Debug)]
pub struct SummaryLine<'a>(pub &'a CloneSummary);

impl fmt::Display for SummaryLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.0;
        let head = if summary.failed > 0 {
            style("Done with failures:").red().bold()
        } else if summary.aborted > 0 {
            style("Aborted:").yellow().bold()
        } else {
            style("Done:").green().bold()
        };
        write!(f, "{head} {summary}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::responses::RepositoryOwner;

    fn repo() -> RepositoryDescriptor {
        RepositoryDescriptor {
            name: "hello".to_owned(),
            owner: RepositoryOwner { login: "octocat".to_owned() },
            clone_url: "https://github.com/octocat/hello.git".to_owned(),
            ssh_url: "git@github.com:octocat/hello.git".to_owned(),
            fork: true,
            private: false,
            description: Some("A rather long description\nspanning lines and going on".to_owned()),
            language: Some("Rust".to_owned()),
            archived: true,
            pushed_at: None,
        }
    }

    #[test]
    fn test_repository_row() {
        let repo = repo();
        let row = RepositoryRow(&repo).to_string();
        assert_eq!(
            row,
            "public\thello\tA rather long description spanning lin..\t\tRust\tfork, archived"
        );
        assert_eq!(row.split('\t').count(), RepositoryRow::HEADER.split('\t').count());
    }

    #[test]
    fn test_repository_row_pushed_at() {
        let repo = RepositoryDescriptor {
            pushed_at: Some(Utc::now() - chrono::Duration::days(3)),
            ..repo()
        };
        let row = RepositoryRow(&repo).to_string();
        assert_eq!(row.split('\t').nth(3), Some("this week"));
    }

    #[test]
    fn test_outcome_line() {
        console::set_colors_enabled(false);
        let repo = repo();
        let outcome = CloneOutcome::Failed("remote hung up".to_owned());
        assert_eq!(
            OutcomeLine(&repo, &outcome).to_string(),
            "[ fail] hello: failed: remote hung up"
        );
    }
}
