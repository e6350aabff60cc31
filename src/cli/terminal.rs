//! Interactive decisions read from the terminal.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

use colored::*;
use folio::domain::{ArtifactKind, JudgeVerdict};
use folio::iteration::{
    DecisionProvider, DownstreamDecision, ReviewDecision, ReviewPrompt, RevisionDecision, RevisionPrompt,
};

/// Prompts the operator on `output` and reads single-letter answers from `input`.
///
/// End of input counts as the most conservative answer (decline, abort, reject).
pub struct TerminalDecisions<R, W> {
    input: R,
    output: W,
}

impl TerminalDecisions<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalDecisions<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn say(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(self.output, "{}", text.as_ref());
    }

    /// Ask until one of `keys` is entered; `None` on end of input.
    fn ask(&mut self, question: &str, keys: &[char]) -> Option<char> {
        loop {
            let _ = write!(self.output, "{} ", question.bold());
            let _ = self.output.flush();

            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) | Err(_) => {
                    self.say("");
                    return None;
                }
                Ok(_) => {}
            }

            let answer = line.trim().to_lowercase();
            let mut chars = answer.chars();
            match (chars.next(), chars.next()) {
                (Some(key), None) if keys.contains(&key) => return Some(key),
                _ => {}
            }
            let options = keys.iter().map(char::to_string).collect::<Vec<_>>().join("/");
            self.say(format!("Please answer one of: {}", options));
        }
    }
}

impl<R, W> DecisionProvider for TerminalDecisions<R, W>
where
    R: BufRead + Send + Sync,
    W: Write + Send + Sync,
{
    fn confirm_first_iteration(&mut self, kind: ArtifactKind) -> bool {
        self.say(format!(
            "{} This is the first iteration on the {}. Iterating permanently replaces its content.",
            "Warning:".yellow().bold(),
            kind.label()
        ));
        matches!(self.ask("Continue? [y/n]", &['y', 'n']), Some('y'))
    }

    fn downstream_impact(&mut self, kind: ArtifactKind, downstream: &[ArtifactKind]) -> DownstreamDecision {
        self.say(format!(
            "{} These artifacts were generated from the current {}:",
            "Downstream:".yellow().bold(),
            kind.label()
        ));
        for other in downstream {
            self.say(format!("  - {}", other.label()));
        }
        match self.ask("[c]ull them after acceptance, [k]eep them, or [a]bort?", &['c', 'k', 'a']) {
            Some('c') => DownstreamDecision::Cull,
            Some('k') => DownstreamDecision::Keep,
            _ => DownstreamDecision::Abort,
        }
    }

    fn needs_revision(&mut self, prompt: &RevisionPrompt<'_>) -> RevisionDecision {
        self.say(format!(
            "\n{} (attempt {})",
            "Judge: needs revision".red().bold(),
            prompt.attempt
        ));
        self.say(prompt.verdict.describe());

        let answer = if prompt.retry_allowed {
            self.ask(
                "[c]ontinue with this feedback, [a]ccept anyway, [v]iew diff, or [q]uit?",
                &['c', 'a', 'v', 'q'],
            )
        } else {
            self.say("Attempt limit reached.".yellow().to_string());
            self.ask("[a]ccept anyway, [v]iew diff, or [q]uit?", &['a', 'v', 'q'])
        };

        match answer {
            Some('c') => RevisionDecision::Continue,
            Some('a') => RevisionDecision::AcceptAnyway,
            Some('v') => RevisionDecision::ViewDiff,
            _ => RevisionDecision::Abort,
        }
    }

    fn show_diff(&mut self, kind: ArtifactKind, diff: &str) {
        self.say(format!("\n{}", format!("Changes to the {}:", kind.label()).cyan().bold()));
        self.say(diff);
    }

    fn review(&mut self, prompt: &ReviewPrompt<'_>) -> ReviewDecision {
        let status = if prompt.verdict.is_approved() {
            "approved".green()
        } else {
            "not approved".red()
        };
        self.say(format!(
            "\n{} ({} attempt(s), judge {})",
            format!("Proposed {} revision", prompt.kind.label()).cyan().bold(),
            prompt.attempts,
            status
        ));
        self.say(prompt.semantic_diff);

        match self.ask("[a]ccept, [r]eject, or view [d]etail?", &['a', 'r', 'd']) {
            Some('a') => ReviewDecision::Accept,
            Some('d') => ReviewDecision::ViewDetail,
            _ => ReviewDecision::Reject,
        }
    }

    fn show_detail(&mut self, kind: ArtifactKind, new_content: &str, verdict: &JudgeVerdict) {
        self.say(format!("\n{}", "Judge reasoning:".cyan().bold()));
        self.say(verdict.describe());
        self.say(format!("{}", format!("New {}:", kind.label()).cyan().bold()));
        self.say(new_content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn terminal(input: &str) -> TerminalDecisions<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalDecisions::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn output(t: &TerminalDecisions<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8_lossy(&t.output).to_string()
    }

    #[test]
    fn test_confirm_first_iteration() {
        assert!(terminal("y\n").confirm_first_iteration(ArtifactKind::Treatment));
        assert!(!terminal("n\n").confirm_first_iteration(ArtifactKind::Treatment));
        assert!(!terminal("").confirm_first_iteration(ArtifactKind::Treatment));
    }

    #[test]
    fn test_invalid_answer_reprompts() {
        let mut t = terminal("maybe\nK\n");
        let decision = t.downstream_impact(ArtifactKind::Premise, &[ArtifactKind::Treatment]);
        assert_eq!(decision, DownstreamDecision::Keep);
        assert!(output(&t).contains("Please answer one of: c/k/a"));
    }

    #[test]
    fn test_needs_revision_choices() {
        let verdict = JudgeVerdict::needs_revision("Slow").with_issues(["pacing drags"]);
        let prompt = RevisionPrompt {
            kind: ArtifactKind::Treatment,
            attempt: 2,
            verdict: &verdict,
            retry_allowed: true,
        };

        let mut t = terminal("v\nc\n");
        assert_eq!(t.needs_revision(&prompt), RevisionDecision::ViewDiff);
        assert_eq!(t.needs_revision(&prompt), RevisionDecision::Continue);
        assert!(output(&t).contains("pacing drags"));
        assert_eq!(t.needs_revision(&prompt), RevisionDecision::Abort);
    }

    #[test]
    fn test_continue_not_offered_at_limit() {
        let verdict = JudgeVerdict::needs_revision("Slow");
        let prompt = RevisionPrompt {
            kind: ArtifactKind::Treatment,
            attempt: 3,
            verdict: &verdict,
            retry_allowed: false,
        };

        let mut t = terminal("c\na\n");
        assert_eq!(t.needs_revision(&prompt), RevisionDecision::AcceptAnyway);
        assert!(output(&t).contains("Attempt limit reached"));
    }

    #[test]
    fn test_review() {
        let verdict = JudgeVerdict::approved("Good");
        let prompt = ReviewPrompt {
            kind: ArtifactKind::Prose,
            semantic_diff: "- Chapter 2 rewritten",
            attempts: 1,
            verdict: &verdict,
        };

        let mut t = terminal("d\na\n");
        assert_eq!(t.review(&prompt), ReviewDecision::ViewDetail);
        assert_eq!(t.review(&prompt), ReviewDecision::Accept);
        assert!(output(&t).contains("- Chapter 2 rewritten"));
        assert_eq!(t.review(&prompt), ReviewDecision::Reject);
    }
}
