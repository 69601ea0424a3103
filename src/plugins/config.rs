//! # Configuration Workflow
//!
//! The first-run questionnaire, `config --ask`, and the rewriting of the
//! consumer files owned by the repository and build-service clients.
//!
//! After reconciliation the configuration is persisted in three places:
//!
//! 1. `~/.rbuildrc`, the operator-owned values.
//! 2. `~/.conaryrc-rbuild` plus an include stub in `~/.conaryrc`.
//! 3. `~/.rmakerc-rbuild` plus an include stub in `~/.rmakerc`.
//!
//! When the operator declines to store the password it is left out of
//! every file but kept in memory for the rest of the run.

use log::info;

use crate::config::base::BaseDefaults;
use crate::config::writer::{self, Dialect};
use crate::config::{is_complete, Credential, RMAKE_PORT};
use crate::error::Result;
use crate::handle::Handle;
use crate::reconcile::{Authorization, Reconciler, SessionDefaults};

const WELCOME: &str = "\
********************************************************
Welcome to rBuild!  Your configuration is incomplete.
Please answer the following questions to begin using rBuild:
";

/// Hosted servers never run a build service next to them.
const HOSTED_SUFFIX: &str = "rpath.org";

/// Print the merged configuration.
pub fn display_config(handle: &mut Handle, hide_passwords: bool) {
    let text = handle.config().display(hide_passwords);
    for line in text.lines() {
        handle.ui().write(line);
    }
}

/// Run the questionnaire unless the configuration is already complete.
pub fn ensure_config(handle: &mut Handle) -> Result<()> {
    if is_complete(handle.config()) {
        return Ok(());
    }
    initialize_config(handle)
}

/// The first-run questionnaire.
pub fn initialize_config(handle: &mut Handle) -> Result<()> {
    handle.require_home()?;
    handle.ui().write(WELCOME);
    update_config(handle)?;
    let ui = handle.ui();
    ui.write(
        "rBuild configuration complete.  To rerun this configuration test run \
         rbuild config --ask, or simply edit ~/.rbuildrc.",
    );
    ui.write("");
    ui.write(
        "You should now begin working with a product by running \
         'rbuild init <short name> <version>'",
    );
    Ok(())
}

/// Reconcile the server and credentials with the operator, then write
/// every configuration file.
pub fn update_config(handle: &mut Handle) -> Result<()> {
    let home = handle.require_home()?;
    let base = BaseDefaults::read(&home)?;

    if handle.config().server_url().is_none() {
        if let Some(url) = base.server.url.clone() {
            handle.config_mut().set_server_url(url);
        }
    }
    let config = handle.config();
    let default_name = config.name().map(str::to_string).or(base.name);
    let default_contact = config.contact().map(str::to_string).or(base.contact);
    let (default_user, default_password) = match config.user() {
        Some(user) => (Some(user.name.clone()), user.password.clone()),
        None => (base.server.user, base.server.password),
    };
    let rmake_url = config.rmake_url().map(str::to_string).or(base.rmake_url);
    let defaults = SessionDefaults {
        server_url: config.server_url().map(str::to_string),
        user: default_user,
        password: default_password,
    };

    let session = Reconciler::new(handle.ui.as_mut(), &handle.rbuilder, defaults).run()?;
    if session.authorization == Authorization::Overridden {
        info!("Saving configuration that was not authorized by {}", session.server_url);
    }

    if let Some(url) = choose_rmake_url(handle, &session.server_url, rmake_url)? {
        handle.config_mut().set_rmake_url(Some(url));
    }

    let keep_password = handle
        .ui()
        .get_yn("Store your password in the local configuration file?", false)?;
    let password = Some(session.password.clone()).filter(|p| !p.is_empty());
    let full = Credential::new(session.user.clone(), password);
    let stored = if keep_password {
        full.clone()
    } else {
        full.without_password()
    };
    handle.config_mut().set_user(Some(stored));
    handle.config_mut().set_server_url(session.server_url.clone());

    let name = handle.ui().get_response(
        "Name to display when committing",
        default_name.as_deref(),
        None,
    )?;
    let contact = handle.ui().get_response(
        "Contact - usually email or url",
        default_contact.as_deref(),
        None,
    )?;
    handle.config_mut().set_name(name);
    handle.config_mut().set_contact(contact);

    writer::write_rbuild_configuration(&home, handle.config())?;

    // rmakeUser stays out of ~/.rbuildrc unless it was there already, but
    // the build client always gets one
    let copy_rmake_user = handle.config().rmake_user().is_none();
    if copy_rmake_user {
        let user = handle.config().user().cloned();
        handle.config_mut().set_rmake_user(user);
    }
    write_repository_client_configuration(handle)?;
    write_build_client_configuration(handle)?;

    // the rest of this run uses the full credentials
    handle.config_mut().set_user(Some(full.clone()));
    if copy_rmake_user {
        handle.config_mut().set_rmake_user(Some(full));
    }
    handle.refresh_endpoint();
    Ok(())
}

/// Offer the build service on the management server when one answers
/// there.
fn choose_rmake_url(
    handle: &mut Handle,
    server_url: &str,
    current: Option<String>,
) -> Result<Option<String>> {
    if server_url.ends_with(HOSTED_SUFFIX) || !handle.rbuilder().check_for_rmake(server_url) {
        return Ok(current);
    }
    let use_appliance = handle.ui().get_yn(
        "Do you want to use the rMake server running on the rBuilder Appliance?  \
         'N' will use the rMake server on this local machine. (Y/N):",
        true,
    )?;
    if use_appliance {
        Ok(Some(format!(
            "{}:{}",
            server_url.replace("http:", "https:"),
            RMAKE_PORT
        )))
    } else {
        Ok(current)
    }
}

/// Rewrite `~/.conaryrc-rbuild` and create the `~/.conaryrc` stub if
/// missing.
pub fn write_repository_client_configuration(handle: &mut Handle) -> Result<()> {
    let home = handle.require_home()?;
    let rendered = handle.consumer_config(Dialect::RepositoryClient, true)?;
    writer::write_repository_client_configuration(&home, &rendered)
}

/// Rewrite `~/.rmakerc-rbuild` and create the `~/.rmakerc` stub if
/// missing.
pub fn write_build_client_configuration(handle: &mut Handle) -> Result<()> {
    let home = handle.require_home()?;
    let rendered = handle.consumer_config(Dialect::BuildClient, true)?;
    writer::write_build_client_configuration(&home, &rendered)
}
