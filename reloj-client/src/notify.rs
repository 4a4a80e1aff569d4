use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const APP_NAME: &str = "Reloj";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Alarm,
    TimerFinished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn alarm(label: Option<&str>) -> Self {
        let body = match label {
            Some(l) => format!("Time for {l}!"),
            None => "Time for your alarm!".to_string(),
        };
        Self {
            kind: NotificationKind::Alarm,
            title: "Alarm!".to_string(),
            body,
        }
    }

    pub fn timer_finished() -> Self {
        Self {
            kind: NotificationKind::TimerFinished,
            title: "Timer finished!".to_string(),
            body: "Time is up".to_string(),
        }
    }
}

/// Where widget notifications end up.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: &Notification);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NotifierKind {
    Desktop,
    BannerOnly,
}

/// Terminal banner plus, while the desktop accepts them, an OS notification.
/// The first desktop failure downgrades to banner-only for the rest of the
/// process.
#[derive(Debug)]
pub struct DesktopNotifier {
    kind: Mutex<NotifierKind>,
}

impl DesktopNotifier {
    pub fn new(desktop: bool) -> Self {
        let kind = if desktop {
            NotifierKind::Desktop
        } else {
            NotifierKind::BannerOnly
        };
        debug!(?kind, "notifier created");
        Self {
            kind: Mutex::new(kind),
        }
    }

    fn banner(notification: &Notification) {
        println!("*** {} *** {}", notification.title, notification.body);
        info!(kind=?notification.kind, title=%notification.title, "notification raised");
    }
}

#[async_trait]
impl NotificationSink for DesktopNotifier {
    async fn notify(&self, notification: &Notification) {
        Self::banner(notification);

        let mut kind = self.kind.lock().await;
        if *kind == NotifierKind::BannerOnly {
            return;
        }
        if let Err(e) = show_desktop(notification).await {
            warn!(error=%e, "desktop notification failed; falling back to banner only");
            *kind = NotifierKind::BannerOnly;
        }
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
async fn show_desktop(notification: &Notification) -> Result<(), String> {
    let urgency = match notification.kind {
        NotificationKind::Alarm => notify_rust::Urgency::Critical,
        NotificationKind::TimerFinished => notify_rust::Urgency::Normal,
    };
    let mut n = notify_rust::Notification::new();
    n.appname(APP_NAME)
        .summary(&notification.title)
        .body(&notification.body)
        .urgency(urgency)
        .show_async()
        .await
        .map(|_handle| ())
        .map_err(|e| e.to_string())
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
async fn show_desktop(_notification: &Notification) -> Result<(), String> {
    Err(format!(
        "{APP_NAME}: desktop notifications are not supported on this platform"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_body_uses_label() {
        assert_eq!(Notification::alarm(Some("tea")).body, "Time for tea!");
        assert_eq!(Notification::alarm(None).body, "Time for your alarm!");
        assert_eq!(Notification::alarm(None).kind, NotificationKind::Alarm);
    }

    #[tokio::test]
    async fn banner_only_notifier_stays_banner_only() {
        let n = DesktopNotifier::new(false);
        n.notify(&Notification::timer_finished()).await;
        assert_eq!(*n.kind.lock().await, NotifierKind::BannerOnly);
    }
}
