use crate::admin::{hash_password, verify_password};
use crate::cli::{
    AboutCommand, AddWorkArgs, AdminCommand, AuthArgs, GalleryCommand, ImageCommand, InitArgs,
    InquireArgs, ResolveCommand, SubmitArgs,
};
use crate::config::{default_config, load_config, validate_config, write_config, Secrets, SiteConfig};
use crate::contacts::{BrevoContactList, ContactList, DryRunContactList, InquiryFileStore};
use crate::content::{
    add_work, list_uploads, load_about, load_gallery, parse_about_body, parse_gallery_body,
    remove_work, save_about, save_gallery, upload_image, AboutData, GalleryFile, WorkDraft,
    WorkStatus,
};
use crate::image::{fallback_chain, local_file_probe, probe_until_settled, ImageLoader};
use crate::ops_log::{append_failure, ForwardFailure};
use crate::paths::{ensure_site_root, SitePaths};
use crate::recaptcha::RecaptchaVerifier;
use crate::submit::{EndpointReply, InquiryEndpoint, SUCCESS_MESSAGE};
use crate::terminal::{run_answers, run_session, SessionEnd};
use crate::wizard::gate::{BotVerifier, Forwarding, GateOutcome, SubmissionGate};
use crate::wizard::steps::StepRegistry;
use crate::wizard::{FieldValues, WizardController};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;

pub fn run_init(root: &Path, args: InitArgs) -> Result<()> {
    let paths = SitePaths::new(ensure_site_root(root, true)?);
    let config_path = paths.config_path();
    if config_path.is_file() && !args.force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            config_path.display()
        ));
    }

    let mut config = default_config();
    if let Some(base_path) = args.base_path {
        config.base_path = base_path;
    }
    config.admin_password_hash = args
        .admin_password
        .as_deref()
        .map(|password| hash_password(password, args.cost))
        .transpose()?;
    validate_config(&config)?;
    write_config(&paths, &config)?;
    println!("wrote {}", config_path.display());

    if !paths.gallery_path().is_file() {
        save_gallery(&paths, &GalleryFile::default())?;
        println!("wrote {}", paths.gallery_path().display());
    }
    if !paths.about_path().is_file() {
        save_about(&paths, &AboutData::default())?;
        println!("wrote {}", paths.about_path().display());
    }
    for dir in [paths.images_dir(), paths.uploads_dir()] {
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    }
    tracing::info!(root = %paths.root().display(), "site initialized");
    Ok(())
}

/// Pick the sink for accepted inquiries.
fn contact_sink(
    paths: &SitePaths,
    config: &SiteConfig,
    secrets: &Secrets,
    dry_run: bool,
) -> Box<dyn ContactList> {
    if dry_run {
        return Box::new(DryRunContactList);
    }
    match secrets.contact_api_key.as_deref() {
        Some(key) => Box::new(BrevoContactList::new(
            &config.contact_list.api_url,
            key,
            config.contact_list.list_ids.clone(),
        )),
        None => {
            tracing::info!(path = %paths.inquiries_path().display(), "no contact list API key; storing inquiries locally");
            Box::new(InquiryFileStore::new(paths.inquiries_path()))
        }
    }
}

fn bot_verifier(
    config: &SiteConfig,
    secrets: &Secrets,
    token: Option<String>,
) -> Result<Option<RecaptchaVerifier>> {
    if !config.bot_verification.enabled {
        return Ok(None);
    }
    let secret = secrets.recaptcha_secret.as_deref().ok_or_else(|| {
        anyhow!("bot verification is enabled but RECAPTCHA_SECRET_KEY is not set")
    })?;
    Ok(Some(
        RecaptchaVerifier::new(&config.bot_verification.verify_url, secret).with_token(token),
    ))
}

pub fn run_inquire(root: &Path, args: InquireArgs) -> Result<ExitCode> {
    let paths = SitePaths::new(ensure_site_root(root, false)?);
    let config = load_config(&paths)?;
    let secrets = Secrets::from_env();
    let contacts = contact_sink(&paths, &config, &secrets, args.dry_run);
    let verifier = bot_verifier(&config, &secrets, args.recaptcha_token)?;

    let registry = StepRegistry::acquisition_inquiry();
    let mut gate = SubmissionGate::new(contacts.as_ref()).with_source(config.inquiry_source.clone());
    if let Some(verifier) = verifier.as_ref() {
        gate = gate.with_verifier(verifier as &dyn BotVerifier);
    }
    let mut wizard = WizardController::new(&registry, gate);

    let outcome = match args.answers {
        Some(path) => {
            let bytes = fs::read(&path).with_context(|| format!("read answers {}", path.display()))?;
            let answers: FieldValues =
                serde_json::from_slice(&bytes).context("parse answers JSON")?;
            let outcome = run_answers(&mut wizard, answers)?;
            print_json(&json!({ "success": true, "message": SUCCESS_MESSAGE }))?;
            outcome
        }
        None => {
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            match run_session(&mut wizard, stdin.lock(), &mut stdout)? {
                SessionEnd::Submitted(outcome) => outcome,
                SessionEnd::Cancelled => return Ok(ExitCode::FAILURE),
            }
        }
    };
    record_forwarding_failure(&paths, contacts.as_ref(), &outcome);
    Ok(ExitCode::SUCCESS)
}

fn record_forwarding_failure(paths: &SitePaths, contacts: &dyn ContactList, outcome: &GateOutcome) {
    let (Forwarding::Failed(error), Some(record)) = (&outcome.forwarding, &outcome.record) else {
        return;
    };
    let failure = ForwardFailure {
        logged_at: Utc::now(),
        sink: contacts.name().to_string(),
        email: record.email.clone(),
        submitted_at: record.submitted_at,
        error: error.clone(),
    };
    if let Err(err) = append_failure(&paths.forward_failures_path(), &failure) {
        tracing::error!(error = %format!("{err:#}"), "could not record forwarding failure");
    }
}

pub fn run_submit(root: &Path, args: SubmitArgs) -> Result<ExitCode> {
    let paths = SitePaths::new(ensure_site_root(root, false)?);
    let config = load_config(&paths)?;
    let secrets = Secrets::from_env();
    let body = match &args.payload {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("read payload {}", path.display()))?,
        None => {
            let mut body = String::new();
            io::stdin()
                .read_to_string(&mut body)
                .context("read payload from stdin")?;
            body
        }
    };

    let contacts = contact_sink(&paths, &config, &secrets, args.dry_run);
    let verifier = bot_verifier(&config, &secrets, None)?;
    let mut endpoint = InquiryEndpoint::new(
        contacts.as_ref(),
        config.inquiry_source.clone(),
        paths.forward_failures_path(),
    );
    if let Some(verifier) = verifier.as_ref() {
        endpoint = endpoint.with_verifier(verifier as &dyn BotVerifier);
    }
    reply(endpoint.handle(&body, Utc::now()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize response")?;
    println!("{text}");
    Ok(())
}

fn reply(reply: EndpointReply) -> Result<ExitCode> {
    print_json(&reply.body)?;
    if reply.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::debug!(status = reply.status, "endpoint returned an error");
        Ok(ExitCode::FAILURE)
    }
}

fn ok_json<T: Serialize>(value: &T) -> Result<EndpointReply> {
    Ok(EndpointReply {
        status: 200,
        body: serde_json::to_value(value).context("serialize response")?,
    })
}

fn saved(message: &str) -> EndpointReply {
    EndpointReply {
        status: 200,
        body: json!({ "success": true, "message": message }),
    }
}

/// Returns the rejection reply when the password does not check out.
fn authorize(config: &SiteConfig, auth: &AuthArgs) -> Option<EndpointReply> {
    verify_password(config, auth.password.as_deref())
        .err()
        .map(|err| EndpointReply {
            status: 401,
            body: json!({ "success": false, "error": err.to_string() }),
        })
}

fn read_body(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read body {}", path.display()))
}

pub fn run_gallery(root: &Path, command: GalleryCommand) -> Result<ExitCode> {
    let paths = SitePaths::new(ensure_site_root(root, false)?);
    let config = load_config(&paths)?;
    let response = match command {
        GalleryCommand::Show => match load_gallery(&paths) {
            Ok(gallery) => ok_json(&gallery)?,
            Err(err) => EndpointReply::error(404, &err.to_string(), None),
        },
        GalleryCommand::Save { from, auth } => {
            if let Some(rejected) = authorize(&config, &auth) {
                return reply(rejected);
            }
            match parse_gallery_body(&read_body(&from)?) {
                Ok(gallery) => {
                    save_gallery(&paths, &gallery)?;
                    tracing::info!(works = gallery.works.len(), "gallery saved");
                    saved("Gallery data saved successfully")
                }
                Err(err) => EndpointReply::error(400, &err.to_string(), None),
            }
        }
        GalleryCommand::Add(args) => add_gallery_work(&paths, &config, args)?,
        GalleryCommand::Remove { id, auth } => {
            if let Some(rejected) = authorize(&config, &auth) {
                return reply(rejected);
            }
            let mut gallery = load_gallery(&paths)?;
            match remove_work(&mut gallery, &id) {
                Ok(removed) => {
                    save_gallery(&paths, &gallery)?;
                    EndpointReply {
                        status: 200,
                        body: json!({ "success": true, "removed": removed.id }),
                    }
                }
                Err(err) => EndpointReply::error(404, &err.to_string(), None),
            }
        }
        GalleryCommand::Check => check_gallery_images(&paths, &config)?,
    };
    reply(response)
}

fn add_gallery_work(paths: &SitePaths, config: &SiteConfig, args: AddWorkArgs) -> Result<EndpointReply> {
    if let Some(rejected) = authorize(config, &args.auth) {
        return Ok(rejected);
    }
    let mut gallery = if paths.gallery_path().is_file() {
        load_gallery(paths)?
    } else {
        GalleryFile::default()
    };
    let draft = WorkDraft {
        title: args.title,
        year: args.year,
        medium: args.medium,
        dimensions: args.dimensions,
        category: args.category,
        description: args.description,
        image_url: args.image_url,
        status: if args.sold {
            WorkStatus::Sold
        } else {
            WorkStatus::Available
        },
        price: args.price,
    };
    match add_work(&mut gallery, draft) {
        Ok(id) => {
            save_gallery(paths, &gallery)?;
            tracing::info!(id = %id, "gallery work added");
            Ok(EndpointReply {
                status: 200,
                body: json!({ "success": true, "id": id }),
            })
        }
        Err(err) => Ok(EndpointReply::error(400, &err.to_string(), None)),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageCheck {
    id: String,
    requested: String,
    shown: Option<String>,
    attempts: Vec<String>,
    max_attempts: usize,
    alternative: bool,
}

/// Run every gallery image through the fallback chain against `public/`.
fn check_gallery_images(paths: &SitePaths, config: &SiteConfig) -> Result<EndpointReply> {
    let gallery = load_gallery(paths)?;
    let resolver = config.resolver();
    let public_dir = paths.public_dir();
    let probe = local_file_probe(&public_dir, &resolver);
    let mut checks = Vec::with_capacity(gallery.works.len());
    for work in &gallery.works {
        let requested = resolver.resolve_image_path(Some(work.image_url.as_str()));
        let mut loader =
            ImageLoader::new(requested.clone(), fallback_chain(&resolver)).with_alternative();
        let max_attempts = loader.max_attempts();
        let settled = probe_until_settled(&mut loader, &probe);
        if settled.shown.as_deref() != Some(requested.as_str()) {
            tracing::warn!(
                id = %work.id,
                requested = %requested,
                fallbacks_used = loader.attempt_index(),
                "gallery image falls back"
            );
        }
        checks.push(ImageCheck {
            id: work.id.clone(),
            requested,
            shown: settled.shown,
            attempts: settled.attempts,
            max_attempts,
            alternative: settled.alternative,
        });
    }
    ok_json(&json!({ "images": checks }))
}

pub fn run_about(root: &Path, command: AboutCommand) -> Result<ExitCode> {
    let paths = SitePaths::new(ensure_site_root(root, false)?);
    let config = load_config(&paths)?;
    let response = match command {
        AboutCommand::Show => match load_about(&paths) {
            Ok(about) => ok_json(&about)?,
            Err(err) => EndpointReply::error(404, &format!("{err:#}"), None),
        },
        AboutCommand::Save { from, auth } => {
            if let Some(rejected) = authorize(&config, &auth) {
                return reply(rejected);
            }
            match parse_about_body(&read_body(&from)?) {
                Ok(about) => {
                    save_about(&paths, &about)?;
                    tracing::info!("about page saved");
                    saved("About data saved successfully")
                }
                Err(err) => EndpointReply::error(400, &err.to_string(), None),
            }
        }
    };
    reply(response)
}

pub fn run_image(root: &Path, command: ImageCommand) -> Result<ExitCode> {
    let paths = SitePaths::new(ensure_site_root(root, false)?);
    let config = load_config(&paths)?;
    let response = match command {
        ImageCommand::Upload { file, auth } => {
            if let Some(rejected) = authorize(&config, &auth) {
                return reply(rejected);
            }
            match upload_image(&paths, &file) {
                Ok(stored) => EndpointReply {
                    status: 200,
                    body: json!({
                        "success": true,
                        "filePath": stored,
                        "message": "Image uploaded successfully",
                    }),
                },
                Err(err) => EndpointReply::error(400, &format!("{err:#}"), None),
            }
        }
        ImageCommand::Uploads => ok_json(&list_uploads(&paths)?)?,
    };
    reply(response)
}

pub fn run_admin(root: &Path, command: AdminCommand) -> Result<ExitCode> {
    match command {
        AdminCommand::HashPassword { password, cost } => {
            println!("{}", hash_password(&password, cost)?);
            Ok(ExitCode::SUCCESS)
        }
        AdminCommand::Verify { auth } => {
            let paths = SitePaths::new(ensure_site_root(root, false)?);
            let config = load_config(&paths)?;
            match authorize(&config, &auth) {
                Some(rejected) => reply(rejected),
                None => reply(EndpointReply {
                    status: 200,
                    body: json!({ "success": true }),
                }),
            }
        }
    }
}

pub fn run_resolve(root: &Path, command: ResolveCommand) -> Result<()> {
    let paths = SitePaths::new(root.to_path_buf());
    let resolver = load_config(&paths)?.resolver();
    let resolved = match command {
        ResolveCommand::Image { path } => resolver.resolve_image_path(path.as_deref()),
        ResolveCommand::Api { endpoint: None } => resolver.resolve_api_base(),
        ResolveCommand::Api {
            endpoint: Some(endpoint),
        } => resolver.resolve_api_endpoint(&endpoint),
    };
    println!("{resolved}");
    Ok(())
}
