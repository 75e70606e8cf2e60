//!
//! donor-link CLI
//! --------------
//! Command-line front end for the donation platform API: sign in, inspect the current
//! session, and run a donation through the payment-intent flow. The token pair is kept in
//! a session file so consecutive invocations share one session.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use donor_link::config::ClientConfig;
use donor_link::identity::{Gender, RegisterRequest, Role, SessionManager, User};
use donor_link::payments::{DonationRequest, GatewayOutcome, PaymentIntentFlow, PaymentMethod, PaymentsApi};

const DEFAULT_SESSION_FILE: &str = ".donor-link/session.json";

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} login <email> <password>\n  {program} register <first> <last> <email> <password> <DONOR|ADMIN|MANAGER> <MALE|FEMALE|OTHER>\n  {program} whoami\n  {program} refresh\n  {program} logout\n  {program} donate <amount> <cause> [--method CARD|MOBILE_MONEY|BANK_TRANSFER] [--event <id>] [--text <message>] [--cancel]\n\nEnvironment:\n  DONOR_LINK_BASE_URL            API base URL (default: http://127.0.0.1:8080/)\n  DONOR_LINK_CONNECT_TIMEOUT_MS  connect timeout (default: 10000)\n  DONOR_LINK_REQUEST_TIMEOUT_MS  request timeout (default: 30000)\n  DONOR_LINK_CURRENCY            donation currency (default: RWF)\n  DONOR_LINK_SESSION_FILE        token file (default: {DEFAULT_SESSION_FILE})\n  RUST_LOG                       log filter (default: info)"
    );
}

fn print_user(u: &User) {
    println!("{} <{}> role={} id={}", u.display_name(), u.email, u.role, u.id);
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "donor-link".to_string());
    let Some(cmd) = args.get(1).map(|s| s.as_str()) else {
        print_usage(&program);
        std::process::exit(2);
    };
    if matches!(cmd, "-h" | "--help" | "help") {
        print_usage(&program);
        return Ok(());
    }

    let mut cfg = ClientConfig::from_env();
    if cfg.session_file.is_none() { cfg.session_file = Some(PathBuf::from(DEFAULT_SESSION_FILE)); }
    info!(base_url = %cfg.base_url, currency = %cfg.currency, "donor-link starting");
    let session = SessionManager::from_config(&cfg)?;
    let rest = &args[2..];

    match cmd {
        "login" => {
            let [email, password] = rest else { bail!("login needs <email> <password>") };
            let user = session.login(email, password).await?;
            print_user(&user);
        }
        "register" => {
            let [first, last, email, password, role, gender] = rest else {
                bail!("register needs <first> <last> <email> <password> <role> <gender>")
            };
            let req = RegisterRequest {
                first_name: first.clone(),
                last_name: last.clone(),
                email: email.clone(),
                password: password.clone(),
                confirm_password: password.clone(),
                role: Role::parse(role),
                gender: Gender::parse(gender),
            };
            let errs = req.validate();
            if !errs.is_empty() {
                for e in &errs { eprintln!("{}: {}", e.field, e.message); }
                bail!("registration details are invalid");
            }
            let user = session.register(&req).await?;
            print_user(&user);
        }
        "whoami" => match session.current_user_or_trigger_refresh() {
            Some(u) => print_user(&u),
            None => {
                // an expired token kicks off a refresh; report the settled outcome
                session.wait_for_pending_refresh().await;
                match session.current_user_or_trigger_refresh() {
                    Some(u) => print_user(&u),
                    None => println!("not signed in"),
                }
            }
        },
        "refresh" => match session.refresh_access_token().await {
            Some(_) => println!("session refreshed"),
            None => println!("no session to refresh; please sign in again"),
        },
        "logout" => {
            session.logout().await;
            println!("signed out");
        }
        "donate" => donate(&session, &cfg, rest).await?,
        other => {
            print_usage(&program);
            return Err(anyhow!("unknown command '{}'", other));
        }
    }
    Ok(())
}

async fn donate(session: &SessionManager, cfg: &ClientConfig, rest: &[String]) -> Result<()> {
    let (Some(amount), Some(cause)) = (rest.first(), rest.get(1)) else {
        bail!("donate needs <amount> <cause>");
    };
    let amount: f64 = amount.parse().map_err(|_| anyhow!("amount must be a number"))?;
    let mut request = DonationRequest::new(amount, cause.to_uppercase());
    let mut method = PaymentMethod::MobileMoney;
    let mut cancel_after_create = false;
    let mut i = 2;
    while i < rest.len() {
        match rest[i].as_str() {
            "--method" => {
                let v = rest.get(i + 1).ok_or_else(|| anyhow!("--method needs a value"))?;
                method = PaymentMethod::parse(v).ok_or_else(|| anyhow!("unknown payment method '{}'", v))?;
                i += 2;
            }
            "--event" => {
                let v = rest.get(i + 1).ok_or_else(|| anyhow!("--event needs a value"))?;
                request = request.for_event(v.clone());
                i += 2;
            }
            "--text" => {
                let v = rest.get(i + 1).ok_or_else(|| anyhow!("--text needs a value"))?;
                request = request.with_text(v.clone());
                i += 2;
            }
            "--cancel" => {
                cancel_after_create = true;
                i += 1;
            }
            other => bail!("unknown donate option '{}'", other),
        }
    }

    let flow = PaymentIntentFlow::new(PaymentsApi::new(session.clone(), cfg.currency.clone()));
    let intent = flow.create_intent(request).await?;
    println!("payment {} opened: {} {}", intent.payment_intent_id, intent.amount, intent.currency);
    if cancel_after_create {
        flow.cancel().await;
        println!("payment cancelled; no donation was made");
        return Ok(());
    }

    // The gateway step happens outside this client; report a successful outcome with a
    // fresh transaction reference.
    let outcome = GatewayOutcome::succeeded(uuid::Uuid::new_v4().to_string(), r#"{"source":"cli"}"#);
    match flow.confirm(&intent.payment_intent_id, method, &outcome).await {
        Ok(donation) => println!("thank you! donation {} recorded", donation),
        Err(e) => {
            if e.is_recoverable() { flow.cancel().await; }
            return Err(e.into());
        }
    }
    Ok(())
}
