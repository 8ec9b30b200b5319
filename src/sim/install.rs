/// Install / update helper.
///
/// Drives the install-prompt lifecycle, worker registration, the update
/// notice, the launch-difficulty shortcut and the connectivity banner. The
/// platform side is behind `InstallHost`; the helper only keeps state and
/// decides what to show. It never touches the game directly: a launch
/// shortcut comes out of `tick` as `InstallEvent::StartGame`.
///
/// `on_update_found`, `on_worker_installed`, `on_install_offer` and
/// `on_app_installed` are platform callbacks. Only a host with an asset
/// worker and an install prompt calls them; `TerminalHost` runs as an
/// installed app with nothing to update, so the terminal binary reaches
/// this flow only through registration, the launch shortcut, the
/// connectivity notices and `confirm`/`dismiss`.
///
/// Prompt lifecycle:
///   offer --(delay, not installed)--> visible --accept--> host prompt --> gone
///                                             --dismiss--> hidden (offer kept)
///   app installed --> prompt gone, success notice for a few seconds

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::domain::grid::Difficulty;

pub const DEFAULT_WORKER_PATH: &str = "/static/sw.js";
pub const DEFAULT_PROMPT_DELAY: Duration = Duration::from_millis(3000);
pub const DEFAULT_LAUNCH_DELAY: Duration = Duration::from_millis(1000);
const INSTALLED_NOTICE: Duration = Duration::from_secs(5);
const BACK_ONLINE_NOTICE: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
#[error("{0}")]
pub struct HostError(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

/// Platform services the helper relies on.
pub trait InstallHost {
    /// Deferred install prompt, handed over by the platform.
    type Prompt;

    fn register_worker(&mut self, script_path: &str) -> Result<(), HostError>;
    /// True when a worker already controls the running app.
    fn has_controller(&self) -> bool;
    /// True when running as an installed app.
    fn is_standalone(&self) -> bool;
    fn prompt(&mut self, prompt: Self::Prompt) -> InstallOutcome;
    fn reload(&mut self);
}

#[derive(Clone, Debug)]
pub struct InstallConfig {
    pub worker_path: String,
    pub prompt_delay: Duration,
    pub launch_delay: Duration,
}

impl Default for InstallConfig {
    fn default() -> Self {
        InstallConfig {
            worker_path: DEFAULT_WORKER_PATH.to_string(),
            prompt_delay: DEFAULT_PROMPT_DELAY,
            launch_delay: DEFAULT_LAUNCH_DELAY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    InstallPrompt,
    UpdateAvailable,
    Installed,
    Offline,
    BackOnline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallEvent {
    StartGame(Difficulty),
}

pub struct InstallHelper<H: InstallHost> {
    host: H,
    config: InstallConfig,
    deferred: Option<H::Prompt>,
    prompt_due: Option<Instant>,
    prompt_visible: bool,
    update_found: bool,
    update_visible: bool,
    installed_until: Option<Instant>,
    launch: Option<(Difficulty, Instant)>,
    offline: bool,
    online_until: Option<Instant>,
}

impl<H: InstallHost> InstallHelper<H> {
    pub fn new(host: H, config: InstallConfig) -> Self {
        InstallHelper {
            host,
            config,
            deferred: None,
            prompt_due: None,
            prompt_visible: false,
            update_found: false,
            update_visible: false,
            installed_until: None,
            launch: None,
            offline: false,
            online_until: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Register the worker and arm the launch shortcut, if any.
    pub fn start(&mut self, launch: Option<Difficulty>, now: Instant) {
        match self.host.register_worker(&self.config.worker_path) {
            Ok(()) => tracing::info!(path = %self.config.worker_path, "worker registered"),
            Err(err) => tracing::warn!(error = %err, "worker registration failed"),
        }
        if let Some(difficulty) = launch {
            tracing::info!(%difficulty, "launch shortcut armed");
            self.launch = Some((difficulty, now + self.config.launch_delay));
        }
    }

    // ── Worker updates ──
    // Platform callbacks; the terminal host raises none of them.

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn on_update_found(&mut self) {
        self.update_found = true;
    }

    /// The new worker finished installing. Only an app already under a
    /// controller has something to update.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn on_worker_installed(&mut self) {
        if self.update_found && self.host.has_controller() {
            self.update_visible = true;
        }
        self.update_found = false;
    }

    pub fn apply_update(&mut self) {
        if self.update_visible {
            self.update_visible = false;
            self.host.reload();
        }
    }

    pub fn dismiss_update(&mut self) {
        self.update_visible = false;
    }

    // ── Install prompt ──

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn on_install_offer(&mut self, prompt: H::Prompt, now: Instant) {
        self.deferred = Some(prompt);
        self.prompt_due = Some(now + self.config.prompt_delay);
    }

    /// Relay the deferred prompt to the host. The handle is single-use.
    pub fn accept_install(&mut self) -> Option<InstallOutcome> {
        let prompt = self.deferred.take()?;
        let outcome = self.host.prompt(prompt);
        match outcome {
            InstallOutcome::Accepted => tracing::info!("install prompt accepted"),
            InstallOutcome::Dismissed => tracing::info!("install prompt dismissed"),
        }
        self.prompt_visible = false;
        self.prompt_due = None;
        Some(outcome)
    }

    pub fn dismiss_install(&mut self) {
        self.prompt_visible = false;
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn on_app_installed(&mut self, now: Instant) {
        self.prompt_visible = false;
        self.prompt_due = None;
        self.deferred = None;
        self.installed_until = Some(now + INSTALLED_NOTICE);
    }

    pub fn dismiss_installed(&mut self) {
        self.installed_until = None;
    }

    // ── Connectivity ──

    pub fn on_connectivity(&mut self, online: bool, now: Instant) {
        if online {
            if self.offline {
                self.online_until = Some(now + BACK_ONLINE_NOTICE);
            }
            self.offline = false;
        } else {
            self.offline = true;
            self.online_until = None;
        }
    }

    // ── Key routing ──

    /// Act on the most prominent notice that takes an answer.
    pub fn confirm(&mut self) {
        if self.update_visible {
            self.apply_update();
        } else if self.prompt_visible {
            self.accept_install();
        } else if self.installed_until.is_some() {
            self.dismiss_installed();
        }
    }

    pub fn dismiss(&mut self) {
        if self.update_visible {
            self.dismiss_update();
        } else if self.prompt_visible {
            self.dismiss_install();
        } else if self.installed_until.is_some() {
            self.dismiss_installed();
        }
    }

    /// True when some notice would react to `confirm` or `dismiss`.
    pub fn wants_answer(&self) -> bool {
        self.update_visible || self.prompt_visible || self.installed_until.is_some()
    }

    // ── Timers ──

    pub fn tick(&mut self, now: Instant) -> Vec<InstallEvent> {
        let mut events = Vec::new();

        if let Some(due) = self.prompt_due {
            if now >= due {
                self.prompt_due = None;
                if self.deferred.is_some() && !self.host.is_standalone() {
                    self.prompt_visible = true;
                }
            }
        }
        if self.installed_until.is_some_and(|t| now >= t) {
            self.installed_until = None;
        }
        if self.online_until.is_some_and(|t| now >= t) {
            self.online_until = None;
        }
        if let Some((difficulty, due)) = self.launch {
            if now >= due {
                self.launch = None;
                events.push(InstallEvent::StartGame(difficulty));
            }
        }

        events
    }

    /// Notices to draw, most prominent first.
    pub fn notices(&self) -> Vec<Notice> {
        let mut out = Vec::new();
        if self.update_visible {
            out.push(Notice::UpdateAvailable);
        }
        if self.prompt_visible {
            out.push(Notice::InstallPrompt);
        }
        if self.installed_until.is_some() {
            out.push(Notice::Installed);
        }
        if self.offline {
            out.push(Notice::Offline);
        } else if self.online_until.is_some() {
            out.push(Notice::BackOnline);
        }
        out
    }
}

/// Difficulty from the launch shortcut. The flag wins over the URL; only
/// the four known lowercase names count.
pub fn launch_difficulty(flag: Option<&str>, launch_url: Option<&str>) -> Option<Difficulty> {
    if let Some(d) = flag.and_then(|f| f.parse().ok()) {
        return Some(d);
    }
    launch_url
        .and_then(query_param_difficulty)
        .and_then(|v| v.parse().ok())
}

/// First `difficulty=` value in the query string of `url`.
fn query_param_difficulty(url: &str) -> Option<&str> {
    let query = match url.split_once('?') {
        Some((_, q)) => q,
        None => url,
    };
    let query = query.split('#').next().unwrap_or("");
    query.split('&').find_map(|pair| match pair.split_once('=') {
        Some(("difficulty", value)) => Some(value),
        _ => None,
    })
}

// ── Terminal host ──

/// Host for the terminal client. It always runs as an installed app, so
/// the install prompt never shows; a reload means restart from the welcome
/// screen.
#[derive(Debug, Default)]
pub struct TerminalHost {
    reload_requested: bool,
}

impl TerminalHost {
    pub fn take_reload(&mut self) -> bool {
        std::mem::take(&mut self.reload_requested)
    }
}

impl InstallHost for TerminalHost {
    type Prompt = ();

    fn register_worker(&mut self, script_path: &str) -> Result<(), HostError> {
        if !script_path.starts_with('/') {
            return Err(HostError(format!("worker path `{script_path}` is not absolute")));
        }
        tracing::debug!(script_path, "no asset cache in the terminal");
        Ok(())
    }

    fn has_controller(&self) -> bool {
        true
    }

    fn is_standalone(&self) -> bool {
        true
    }

    fn prompt(&mut self, _prompt: ()) -> InstallOutcome {
        InstallOutcome::Dismissed
    }

    fn reload(&mut self) {
        self.reload_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scriptable host recording what the helper asked for.
    #[derive(Default)]
    struct FakeHost {
        registered: Vec<String>,
        controller: bool,
        standalone: bool,
        answer: Option<InstallOutcome>,
        prompted: Vec<u32>,
        reloads: usize,
    }

    impl InstallHost for FakeHost {
        type Prompt = u32;

        fn register_worker(&mut self, script_path: &str) -> Result<(), HostError> {
            self.registered.push(script_path.to_string());
            Ok(())
        }

        fn has_controller(&self) -> bool {
            self.controller
        }

        fn is_standalone(&self) -> bool {
            self.standalone
        }

        fn prompt(&mut self, prompt: u32) -> InstallOutcome {
            self.prompted.push(prompt);
            self.answer.unwrap_or(InstallOutcome::Dismissed)
        }

        fn reload(&mut self) {
            self.reloads += 1;
        }
    }

    fn helper(host: FakeHost) -> InstallHelper<FakeHost> {
        InstallHelper::new(host, InstallConfig::default())
    }

    #[test]
    fn start_registers_worker_path() {
        let mut h = helper(FakeHost::default());
        h.start(None, Instant::now());
        assert_eq!(h.host().registered, vec!["/static/sw.js".to_string()]);
    }

    #[test]
    fn prompt_appears_after_delay() {
        let t0 = Instant::now();
        let mut h = helper(FakeHost::default());
        h.on_install_offer(7, t0);
        h.tick(t0 + Duration::from_millis(2999));
        assert!(h.notices().is_empty());
        h.tick(t0 + Duration::from_millis(3000));
        assert_eq!(h.notices(), vec![Notice::InstallPrompt]);
    }

    #[test]
    fn prompt_suppressed_when_already_installed() {
        let t0 = Instant::now();
        let mut h = helper(FakeHost { standalone: true, ..FakeHost::default() });
        h.on_install_offer(7, t0);
        h.tick(t0 + Duration::from_secs(4));
        assert!(h.notices().is_empty());
    }

    #[test]
    fn accept_relays_once_and_drops_handle() {
        let t0 = Instant::now();
        let mut h = helper(FakeHost {
            answer: Some(InstallOutcome::Accepted),
            ..FakeHost::default()
        });
        h.on_install_offer(7, t0);
        h.tick(t0 + Duration::from_secs(3));
        h.confirm();
        assert_eq!(h.host().prompted, vec![7]);
        assert!(h.notices().is_empty());
        assert_eq!(h.accept_install(), None, "handle is single-use");
    }

    #[test]
    fn dismiss_hides_prompt_but_keeps_offer() {
        let t0 = Instant::now();
        let mut h = helper(FakeHost::default());
        h.on_install_offer(7, t0);
        h.tick(t0 + Duration::from_secs(3));
        h.dismiss();
        assert!(h.notices().is_empty());
        assert_eq!(h.accept_install(), Some(InstallOutcome::Dismissed));
    }

    #[test]
    fn app_installed_shows_success_for_five_seconds() {
        let t0 = Instant::now();
        let mut h = helper(FakeHost::default());
        h.on_install_offer(7, t0);
        h.on_app_installed(t0 + Duration::from_secs(1));
        h.tick(t0 + Duration::from_secs(4));
        assert_eq!(h.notices(), vec![Notice::Installed], "pending prompt cancelled");
        h.tick(t0 + Duration::from_secs(6));
        assert!(h.notices().is_empty());
    }

    #[test]
    fn update_notice_needs_an_active_controller() {
        let mut first_run = helper(FakeHost::default());
        first_run.on_update_found();
        first_run.on_worker_installed();
        assert!(first_run.notices().is_empty());

        let mut h = helper(FakeHost { controller: true, ..FakeHost::default() });
        h.on_worker_installed();
        assert!(h.notices().is_empty(), "no update was found");
        h.on_update_found();
        h.on_worker_installed();
        assert_eq!(h.notices(), vec![Notice::UpdateAvailable]);
        h.confirm();
        assert_eq!(h.host().reloads, 1);
        assert!(h.notices().is_empty());
    }

    #[test]
    fn launch_shortcut_fires_once_after_delay() {
        let t0 = Instant::now();
        let mut h = helper(FakeHost::default());
        h.start(Some(Difficulty::Hard), t0);
        assert!(h.tick(t0 + Duration::from_millis(500)).is_empty());
        assert_eq!(
            h.tick(t0 + Duration::from_millis(1000)),
            vec![InstallEvent::StartGame(Difficulty::Hard)]
        );
        assert!(h.tick(t0 + Duration::from_secs(2)).is_empty());
    }

    #[test]
    fn launch_difficulty_parses_query_and_flag() {
        assert_eq!(
            launch_difficulty(None, Some("https://sudoku.example/?difficulty=hard")),
            Some(Difficulty::Hard)
        );
        assert_eq!(
            launch_difficulty(None, Some("?mode=x&difficulty=expert#top")),
            Some(Difficulty::Expert)
        );
        assert_eq!(launch_difficulty(None, Some("/?difficulty=insane")), None);
        assert_eq!(launch_difficulty(None, Some("/?difficulty=Easy")), None);
        assert_eq!(launch_difficulty(Some("easy"), Some("?difficulty=hard")), Some(Difficulty::Easy));
        assert_eq!(launch_difficulty(Some("bogus"), None), None);
        assert_eq!(launch_difficulty(None, None), None);
    }

    #[test]
    fn offline_is_sticky_and_back_online_expires() {
        let t0 = Instant::now();
        let mut h = helper(FakeHost::default());
        h.on_connectivity(true, t0);
        assert!(h.notices().is_empty(), "no banner without a prior outage");

        h.on_connectivity(false, t0);
        h.tick(t0 + Duration::from_secs(60));
        assert_eq!(h.notices(), vec![Notice::Offline]);

        let back = t0 + Duration::from_secs(61);
        h.on_connectivity(true, back);
        assert_eq!(h.notices(), vec![Notice::BackOnline]);
        h.tick(back + Duration::from_secs(3));
        assert!(h.notices().is_empty());
    }

    #[test]
    fn terminal_host_never_prompts_and_records_reload() {
        let t0 = Instant::now();
        let mut h = InstallHelper::new(TerminalHost::default(), InstallConfig::default());
        h.start(None, t0);
        h.on_install_offer((), t0);
        h.tick(t0 + Duration::from_secs(5));
        assert!(!h.wants_answer());

        h.on_update_found();
        h.on_worker_installed();
        h.confirm();
        assert!(h.host_mut().take_reload());
        assert!(!h.host_mut().take_reload());
    }
}
