//! The `package-state` shell command.
//!
//! ```text
//! <package> <user> [add-flags HEX] [clear-flags HEX]
//!     [set-storage-scopes HEX|null] [set-contact-scopes HEX|null]
//!     [set-kill-uid-after-apply BOOL] [set-notify-uid-after-apply BOOL]
//! ```
//!
//! Edits are applied in one update by the shell identity. Exit status is 0
//! when the update was applied and 1 otherwise.

use anyhow::{anyhow, bail, Context};
use bytes::Bytes;
use tracing::{error, info};

use scopes_client::StateEditor;
use scopes_core::{AppId, BaseFlags, PackageName, StateService, Uid, UserId};

/// One edit named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEdit {
    AddFlags(BaseFlags),
    ClearFlags(BaseFlags),
    SetStorageScopes(Option<Bytes>),
    SetContactScopes(Option<Bytes>),
    SetKillUidAfterApply(bool),
    SetNotifyUidAfterApply(bool),
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub package: PackageName,
    pub user: UserId,
    pub edits: Vec<ShellEdit>,
}

impl ShellCommand {
    pub fn parse<S: AsRef<str>>(args: &[S]) -> anyhow::Result<Self> {
        let mut args = args.iter().map(|s| s.as_ref());

        let package = args.next().ok_or_else(|| anyhow!("missing package name"))?;
        let user = args.next().ok_or_else(|| anyhow!("missing user id"))?;
        let user = user
            .parse::<u32>()
            .with_context(|| format!("invalid user id: {}", user))?;

        let mut edits = Vec::new();
        while let Some(verb) = args.next() {
            let mut value = || args.next().ok_or_else(|| anyhow!("{} requires an argument", verb));
            let edit = match verb {
                "add-flags" => ShellEdit::AddFlags(parse_flags(value()?)?),
                "clear-flags" => ShellEdit::ClearFlags(parse_flags(value()?)?),
                "set-storage-scopes" => ShellEdit::SetStorageScopes(parse_blob(value()?)?),
                "set-contact-scopes" => ShellEdit::SetContactScopes(parse_blob(value()?)?),
                "set-kill-uid-after-apply" => ShellEdit::SetKillUidAfterApply(parse_bool(value()?)?),
                "set-notify-uid-after-apply" => ShellEdit::SetNotifyUidAfterApply(parse_bool(value()?)?),
                other => bail!("unknown argument: {}", other),
            };
            edits.push(edit);
        }

        Ok(Self {
            package: PackageName::new(package),
            user: UserId(user),
            edits,
        })
    }

    /// Apply the edits through `service`, starting from the record it
    /// currently reports.
    pub fn execute<S: StateService + ?Sized>(&self, service: &S) -> anyhow::Result<bool> {
        let mut editor = StateEditor::load(service, self.package.clone(), self.user)
            .with_context(|| format!("failed to load state of {}", self.package))?;

        for edit in &self.edits {
            match edit {
                ShellEdit::AddFlags(flags) => editor.add_flags(*flags),
                ShellEdit::ClearFlags(flags) => editor.clear_flags(*flags),
                ShellEdit::SetStorageScopes(blob) => editor.set_path_scopes(blob.clone()),
                ShellEdit::SetContactScopes(blob) => editor.set_contact_scopes(blob.clone()),
                ShellEdit::SetKillUidAfterApply(v) => editor.set_kill_uid_after_apply(*v),
                ShellEdit::SetNotifyUidAfterApply(v) => editor.set_notify_uid_after_apply(*v),
            };
        }

        Ok(editor.apply(service)?)
    }
}

fn parse_flags(s: &str) -> anyhow::Result<BaseFlags> {
    let bits = u32::from_str_radix(s, 16).with_context(|| format!("invalid hex flags: {}", s))?;
    Ok(BaseFlags::from_raw(bits))
}

fn parse_blob(s: &str) -> anyhow::Result<Option<Bytes>> {
    if s == "null" {
        return Ok(None);
    }
    let bytes = hex::decode(s).with_context(|| format!("invalid hex payload: {}", s))?;
    Ok(Some(Bytes::from(bytes)))
}

fn parse_bool(s: &str) -> anyhow::Result<bool> {
    if s.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if s.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        bail!("invalid boolean: {}", s)
    }
}

/// The identity shell commands run as.
pub fn shell_uid() -> Uid {
    Uid::new(UserId::SYSTEM, AppId::SHELL)
}

/// Parse and run a command line, returning the exit status.
pub fn run<S, A>(service: &S, args: &[A]) -> i32
where
    S: StateService + ?Sized,
    A: AsRef<str>,
{
    let result = ShellCommand::parse(args).and_then(|cmd| {
        let applied = cmd.execute(service)?;
        info!(package = %cmd.package, user = cmd.user.0, applied, "shell edit");
        Ok(applied)
    });

    match result {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            error!(error = %format!("{:#}", e), "package-state command failed");
            1
        }
    }
}
