use crate::bot::{Data, Error};
use poise::FrameworkError;
use std::error::Error as StdError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandErrorKind {
    NotFound,
    MissingPermission,
    MissingArgument,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Swallow,
    Surface,
}

impl CommandErrorKind {
    pub fn of(error: &FrameworkError<'_, Data, Error>) -> Self {
        match error {
            FrameworkError::UnknownCommand { .. } => CommandErrorKind::NotFound,
            FrameworkError::MissingUserPermissions { .. } => CommandErrorKind::MissingPermission,
            FrameworkError::ArgumentParse { error, input, .. } => {
                Self::of_argument_parse(error.as_ref(), input.as_deref())
            }
            _ => CommandErrorKind::Other,
        }
    }

    /// An argument that was never given is a missing argument; one that was
    /// given but failed to parse is a real error.
    pub fn of_argument_parse(
        error: &(dyn StdError + Send + Sync + 'static),
        input: Option<&str>,
    ) -> Self {
        if input.is_none() || error.is::<poise::TooFewArguments>() {
            CommandErrorKind::MissingArgument
        } else {
            CommandErrorKind::Other
        }
    }

    /// Users get no feedback for the expected mistakes; everything else is
    /// surfaced.
    pub fn disposition(self) -> Disposition {
        match self {
            CommandErrorKind::NotFound
            | CommandErrorKind::MissingPermission
            | CommandErrorKind::MissingArgument => Disposition::Swallow,
            CommandErrorKind::Other => Disposition::Surface,
        }
    }
}

pub async fn on_error(error: FrameworkError<'_, Data, Error>) {
    let kind = CommandErrorKind::of(&error);

    match kind.disposition() {
        Disposition::Swallow => {
            tracing::debug!("Ignoring expected command error ({:?})", kind);
        }
        Disposition::Surface => {
            tracing::error!("Unhandled command error: {}", error);
            if let Err(e) = poise::builtins::on_error(error).await {
                tracing::error!("Error while reporting command error: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_errors_are_swallowed() {
        for kind in [
            CommandErrorKind::NotFound,
            CommandErrorKind::MissingPermission,
            CommandErrorKind::MissingArgument,
        ] {
            assert_eq!(kind.disposition(), Disposition::Swallow, "{:?}", kind);
        }
    }

    #[test]
    fn other_errors_are_surfaced() {
        assert_eq!(CommandErrorKind::Other.disposition(), Disposition::Surface);
    }

    #[test]
    fn too_few_arguments_is_swallowed() {
        let error: Error = Box::new(poise::TooFewArguments::default());
        let kind = CommandErrorKind::of_argument_parse(error.as_ref(), None);

        assert_eq!(kind, CommandErrorKind::MissingArgument);
        assert_eq!(kind.disposition(), Disposition::Swallow);
    }

    #[test]
    fn absent_input_is_a_missing_argument() {
        let error: Error = "no value".into();
        assert_eq!(
            CommandErrorKind::of_argument_parse(error.as_ref(), None),
            CommandErrorKind::MissingArgument
        );
    }

    #[test]
    fn unparsable_argument_is_surfaced() {
        let error: Error = Box::new("abc".parse::<u64>().unwrap_err());
        let kind = CommandErrorKind::of_argument_parse(error.as_ref(), Some("abc"));

        assert_eq!(kind, CommandErrorKind::Other);
        assert_eq!(kind.disposition(), Disposition::Surface);
    }
}
