use crate::config::SupervisorConfig;
use crate::logs::{OutputTarget, StdStream};
use crate::process::ProcessUsage;
use crate::status::StatusSnapshot;
use std::path::Path;
use std::time::{Duration, SystemTime};
use sysinfo::{Disks, ProcessRefreshKind, ProcessesToUpdate, System};

const OMITTED: &str = "<omitted>";

/// Host and supervisor figures shown in the System section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInfo {
    pub num_cpus: usize,
    /// Space available to unprivileged users on the working directory's disk
    pub disk_free: u64,
    pub disk_total: u64,
    /// Resident memory of the supervisor itself
    pub supervisor_memory: u64,
}

impl SystemInfo {
    /// Gather CPU, disk, and memory figures. Anything unreadable is left at 0.
    pub fn collect(working_dir: &Path) -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        let num_cpus = system.cpus().len();

        let supervisor_memory = match sysinfo::get_current_pid() {
            Ok(pid) => {
                system.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    true,
                    ProcessRefreshKind::new().with_memory(),
                );
                system.process(pid).map(|p| p.memory()).unwrap_or(0)
            }
            Err(_) => 0,
        };

        let (disk_free, disk_total) = disk_usage_for(working_dir);

        Self {
            num_cpus,
            disk_free,
            disk_total,
            supervisor_memory,
        }
    }
}

/// Free and total bytes of the mount holding `path` (longest mount point prefix)
fn disk_usage_for(path: &Path) -> (u64, u64) {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let disks = Disks::new_with_refreshed_list();

    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| (disk.available_space(), disk.total_space()))
        .unwrap_or((0, 0))
}

/// Everything the status page shows, gathered at request time
#[derive(Debug, Clone)]
pub struct StatusPage {
    pub service_name: String,
    pub status_color: String,
    pub listen_addr: String,
    pub show_full_data: bool,
    pub webhook_installed: bool,
    pub webhook_script: String,
    pub webhook_token: String,
    pub command: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub restart_delay_ms: u64,
    pub status: StatusSnapshot,
    /// Child usage, or the reason it could not be read. `None` while no child runs.
    pub usage: Option<std::result::Result<ProcessUsage, String>>,
    pub process_uptime: Duration,
    pub supervisor_uptime: Duration,
    pub system: SystemInfo,
}

impl StatusPage {
    pub fn new(
        config: &SupervisorConfig,
        status: StatusSnapshot,
        usage: Option<std::result::Result<ProcessUsage, String>>,
        supervisor_uptime: Duration,
        system: SystemInfo,
    ) -> Self {
        let process_uptime = status
            .process_started_at
            .and_then(|started| SystemTime::now().duration_since(started).ok())
            .unwrap_or_default();

        Self {
            service_name: config.service_name.clone(),
            status_color: config.status_color.clone(),
            listen_addr: config.status_serv.clone().unwrap_or_default(),
            show_full_data: config.show_full_data,
            webhook_installed: config.webhook_installed(),
            webhook_script: config
                .webhook_script
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            webhook_token: config.webhook_token.clone().unwrap_or_default(),
            command: config.command.clone(),
            stdout: OutputTarget::parse(&config.stdout, StdStream::Stdout).label(),
            stderr: OutputTarget::parse(&config.stderr, StdStream::Stderr).label(),
            restart_delay_ms: config.restart_delay_ms,
            status,
            usage,
            process_uptime,
            supervisor_uptime,
            system,
        }
    }

    fn omit_unless_full(&self, value: &str) -> String {
        if self.show_full_data {
            escape_html(value)
        } else {
            escape_html(OMITTED)
        }
    }
}

/// Render the full HTML status page
pub fn render_status_page(page: &StatusPage) -> String {
    let name = escape_html(&page.service_name);
    let mut html = String::with_capacity(4096);

    html.push_str("<html>\n<head>\n");
    html.push_str(&format!("<title>{}</title>\n", name));
    html.push_str(&stylesheet(&escape_html(&page.status_color)));
    html.push_str("</head>\n<body>\n");
    html.push_str("<table class=\"main top\">\n");
    html.push_str(&format!("<thead><tr><th>{}</th></tr></thead>\n<tbody>\n", name));

    html.push_str(&section("Status", &status_rows(page)));
    html.push_str(&section("Configuration", &config_rows(page)));
    html.push_str(&section("System", &system_rows(page)));

    html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    html
}

fn stylesheet(header_color: &str) -> String {
    format!(
        "<style>
.section-header {{ width: 250px; }}
.top {{ font-size: 1.25em; font-weight: bold; }}
.main {{ width: 100%; border: 1px solid #C0C0C0; border-collapse: collapse; padding: 5px; }}
.main th {{ border: 1px solid #C0C0C0; padding: 5px; background: {}; }}
.main td {{ border: 1px solid #C0C0C0; padding: 5px; }}
.flag {{ font-style: italic; }}
.argline {{ padding-left: 8px; }}
</style>\n",
        header_color
    )
}

fn section(title: &str, rows: &[(&str, String)]) -> String {
    let mut out = String::new();
    out.push_str("<tr><td>\n<table class=\"main\">\n");
    out.push_str(&format!(
        "<thead><tr><th class=\"section-header\">{}</th><th></th></tr></thead>\n<tbody>\n",
        title
    ));
    for (label, value) in rows {
        out.push_str(&format!("<tr><td>{}</td><td>{}</td></tr>\n", label, value));
    }
    out.push_str("</tbody>\n</table>\n</td></tr>\n");
    out
}

fn status_rows(page: &StatusPage) -> Vec<(&'static str, String)> {
    let status = &page.status;

    let usage = match page.usage {
        Some(Ok(ref usage)) => format!(
            "Memory usage: {}<br>\nUptime: {}<br>\nCPU time: {}",
            format_bytes(usage.pss_bytes),
            format_uptime(page.process_uptime),
            format_cpu_time(usage.cpu_time)
        ),
        Some(Err(ref reason)) => {
            format!("Failed to read resource usage: {}", escape_html(reason))
        }
        None => "Process is not running".to_string(),
    };

    vec![
        ("Running", bool_color(status.running)),
        ("Last PID", status.pid.to_string()),
        ("Restart count", status.restart_count.to_string()),
        (
            "Last termination error",
            escape_html(status.last_error.as_deref().unwrap_or("")),
        ),
        ("Webhook in progress", bool_color(status.redeploy_in_progress)),
        ("Webhook invocations", status.redeploy_count.to_string()),
        ("Resource usage", usage),
    ]
}

fn config_rows(page: &StatusPage) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Show full configuration", bool_color(page.show_full_data)),
        ("Webhook installed", bool_color(page.webhook_installed)),
        ("Statusz address", escape_html(&page.listen_addr)),
    ];

    if page.webhook_installed {
        rows.push(("Webhook script", page.omit_unless_full(&page.webhook_script)));
        rows.push(("Webhook token", page.omit_unless_full(&page.webhook_token)));
    }

    rows.push(("Command", render_command(&page.command, page.show_full_data)));
    rows.push(("Standard out", escape_html(&page.stdout)));
    rows.push(("Standard error", escape_html(&page.stderr)));
    rows.push(("Restart delay (ms)", page.restart_delay_ms.to_string()));
    rows
}

fn system_rows(page: &StatusPage) -> Vec<(&'static str, String)> {
    let system = &page.system;
    vec![
        ("Service uptime", format_uptime(page.supervisor_uptime)),
        ("Num CPUs", system.num_cpus.to_string()),
        (
            "Disk",
            format!(
                "Free: {} ({}%)<br>\nTotal: {}",
                format_bytes(system.disk_free),
                percent(system.disk_free, system.disk_total),
                format_bytes(system.disk_total)
            ),
        ),
        (
            "Memory (babysitter)",
            format!("Resident: {}", format_bytes(system.supervisor_memory)),
        ),
    ]
}

/// Program name, then one line per argument with `--flag value` pairs kept
/// together. Everything after the program is hidden unless `show_full_data`.
fn render_command(command: &[String], show_full_data: bool) -> String {
    let Some((program, args)) = command.split_first() else {
        return String::new();
    };

    let mut out = format!("<span>{}</span>", escape_html(program));

    if !show_full_data {
        out.push_str("<br><br>(Truncated)");
        return out;
    }

    let mut args = args.iter().peekable();
    while let Some(arg) = args.next() {
        let escaped = escape_html(arg);
        if arg.starts_with("--") && args.peek().is_some() {
            let value = args.next().map(|v| escape_html(v)).unwrap_or_default();
            out.push_str(&format!(
                "<br><span class=\"argline\"><span class=\"flag\">{}</span> {}</span>",
                escaped, value
            ));
        } else if arg.starts_with('-') {
            out.push_str(&format!(
                "<br><span class=\"argline\"><span class=\"flag\">{}</span></span>",
                escaped
            ));
        } else {
            out.push_str(&format!("<br><span class=\"argline\">{}</span>", escaped));
        }
    }

    out
}

fn bool_color(value: bool) -> String {
    if value {
        "<span style=\"color: #00AA00;\">Yes</span>".to_string()
    } else {
        "<span style=\"color: #AA0000;\">No</span>".to_string()
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Format a byte count with one decimal and a B/K/M/G suffix
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    let (value, unit) = if bytes >= GB {
        (bytes as f64 / GB as f64, "G")
    } else if bytes >= MB {
        (bytes as f64 / MB as f64, "M")
    } else if bytes >= KB {
        (bytes as f64 / KB as f64, "K")
    } else if bytes >= 1 {
        (bytes as f64, "B")
    } else {
        return "0".to_string();
    };

    let formatted = format!("{:.1}", value);
    format!("{}{}", formatted.strip_suffix(".0").unwrap_or(&formatted), unit)
}

/// Integer percentage of `part` in `total`
pub fn percent(part: u64, total: u64) -> String {
    if total == 0 {
        return "NaN".to_string();
    }
    ((part as u128 * 100) / total as u128).to_string()
}

/// Format CPU time as milliseconds, seconds, minutes, and whole hours
pub fn format_cpu_time(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_nanos() as f64 / 1_000_000.0;

    format!(
        "{:.2} ms, {} secs, {} mins, {} hrs",
        millis,
        secs % 60,
        (secs / 60) % 60,
        secs / 3600
    )
}

/// Format an elapsed time as "H hours, M minutes, S seconds."
pub fn format_uptime(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{} hours, {} minutes, {} seconds.",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    )
}
