use crate::{Directive, Environment, PreprocessorErrorKind};
use source_files::Source;

/// One open `#if`/`#ifdef`/`#ifndef` block
#[derive(Copy, Clone, Debug)]
pub struct Frame {
    pub source: Source,
    /// Whether the enclosing region is emitted
    pub parent_active: bool,
    /// Whether the current branch is emitted
    pub active: bool,
    /// Whether some branch of this block has already been taken
    pub taken: bool,
    pub seen_else: bool,
}

/// Nesting and skipping state of conditional blocks.
///
/// Only the innermost frame decides whether output is suppressed, since a
/// frame can never be active inside an inactive parent.
#[derive(Clone, Debug, Default)]
pub struct ConditionalTracker {
    frames: Vec<Frame>,
}

impl ConditionalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_skipping(&self) -> bool {
        self.frames.last().is_some_and(|frame| !frame.active)
    }

    /// Opens a block, the condition is only evaluated when it can matter
    pub fn push(&mut self, source: Source, condition: impl FnOnce() -> bool) {
        let parent_active = !self.is_skipping();
        let active = parent_active && condition();

        self.frames.push(Frame {
            source,
            parent_active,
            active,
            taken: active,
            seen_else: false,
        });
    }

    pub fn elif(&mut self, condition: impl FnOnce() -> bool) -> Result<(), PreprocessorErrorKind> {
        let Some(frame) = self.frames.last_mut() else {
            return Err(PreprocessorErrorKind::UnmatchedElif);
        };

        if frame.seen_else {
            frame.active = false;
            return Err(PreprocessorErrorKind::ElifAfterElse);
        }

        frame.active = frame.parent_active && !frame.taken && condition();
        frame.taken |= frame.active;
        Ok(())
    }

    pub fn else_branch(&mut self) -> Result<(), PreprocessorErrorKind> {
        let Some(frame) = self.frames.last_mut() else {
            return Err(PreprocessorErrorKind::UnmatchedElse);
        };

        if frame.seen_else {
            frame.active = false;
            return Err(PreprocessorErrorKind::ElseAfterElse);
        }

        frame.active = frame.parent_active && !frame.taken;
        frame.taken = true;
        frame.seen_else = true;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Frame, PreprocessorErrorKind> {
        self.frames
            .pop()
            .ok_or(PreprocessorErrorKind::UnmatchedEndif)
    }

    /// Closes the tracker at end of input, giving the blocks left open
    pub fn finish(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.frames)
    }
}

/// Decides whether the branch opened by a conditional directive is taken.
///
/// `expression` is the raw text following the directive name.
pub trait EvaluateCondition {
    fn evaluate(&self, directive: Directive, expression: &str, environment: &Environment) -> bool;
}

/// Takes every branch whose chain has not been taken yet
#[derive(Copy, Clone, Debug, Default)]
pub struct AssumeActive;

impl EvaluateCondition for AssumeActive {
    fn evaluate(&self, _directive: Directive, _expression: &str, _environment: &Environment) -> bool {
        true
    }
}

/// Answers `#ifdef` and `#ifndef` from the macro table, assumes everything else
#[derive(Copy, Clone, Debug, Default)]
pub struct CheckDefined;

impl EvaluateCondition for CheckDefined {
    fn evaluate(&self, directive: Directive, expression: &str, environment: &Environment) -> bool {
        let name = expression.split_whitespace().next().unwrap_or_default();

        match directive {
            Directive::IfDef => environment.is_defined(name),
            Directive::IfNDef => !environment.is_defined(name),
            _ => true,
        }
    }
}

#[test]
fn test_else_flips_innermost_block_only() {
    let mut tracker = ConditionalTracker::new();

    tracker.push(Source::internal(), || true);
    tracker.push(Source::internal(), || true);
    assert!(!tracker.is_skipping());
    tracker.pop().unwrap();
    assert!(!tracker.is_skipping());
    tracker.else_branch().unwrap();
    assert!(tracker.is_skipping());
    tracker.pop().unwrap();
    assert!(!tracker.is_skipping());
    assert_eq!(tracker.depth(), 0);
}

#[test]
fn test_inactive_parent_suppresses_children() {
    let mut tracker = ConditionalTracker::new();

    tracker.push(Source::internal(), || false);
    tracker.push(Source::internal(), || panic!("condition inside a skipped block"));
    assert!(tracker.is_skipping());
    tracker.else_branch().unwrap();
    assert!(tracker.is_skipping());
    tracker.pop().unwrap();
    tracker.else_branch().unwrap();
    assert!(!tracker.is_skipping());
}

#[test]
fn test_elif_chain_takes_first_branch() {
    let mut tracker = ConditionalTracker::new();

    tracker.push(Source::internal(), || false);
    assert!(tracker.is_skipping());
    tracker.elif(|| true).unwrap();
    assert!(!tracker.is_skipping());
    tracker.elif(|| true).unwrap();
    assert!(tracker.is_skipping());
    tracker.else_branch().unwrap();
    assert!(tracker.is_skipping());
    assert_eq!(tracker.elif(|| true), Err(PreprocessorErrorKind::ElifAfterElse));
    assert_eq!(tracker.else_branch(), Err(PreprocessorErrorKind::ElseAfterElse));
}

#[test]
fn test_unbalanced() {
    let mut tracker = ConditionalTracker::new();

    assert_eq!(tracker.pop().unwrap_err(), PreprocessorErrorKind::UnmatchedEndif);
    assert_eq!(tracker.else_branch(), Err(PreprocessorErrorKind::UnmatchedElse));
    assert_eq!(tracker.elif(|| true), Err(PreprocessorErrorKind::UnmatchedElif));
    assert_eq!(tracker.depth(), 0);

    tracker.push(Source::internal(), || true);
    tracker.push(Source::internal(), || true);
    assert_eq!(tracker.finish().len(), 2);
    assert_eq!(tracker.depth(), 0);
}

#[test]
fn test_check_defined() {
    let mut environment = Environment::default();
    environment.add_predefined("FOO", None);

    assert!(CheckDefined.evaluate(Directive::IfDef, " FOO", &environment));
    assert!(!CheckDefined.evaluate(Directive::IfNDef, " FOO", &environment));
    assert!(!CheckDefined.evaluate(Directive::IfDef, " BAR", &environment));
    assert!(CheckDefined.evaluate(Directive::If, " 0", &environment));
}
