//! Process and network commands: ps, kill, top, jobs, ping, curl, wget,
//! netstat, ifconfig.
//!
//! Nothing here touches a real socket. Hosts resolve to stable fake
//! addresses and `localhost` requests are answered by whatever the process
//! table has listening on the port.

use std::net::Ipv4Addr;
use std::time::Duration;

use devterm_types::error::{DevtermError, Result};
use devterm_types::output::OutputLevel;
use devterm_types::time::{format_clock, now_ms};

use crate::interpreter::{Category, Command, CommandOutput, CommandRegistry, flag_value, positional};
use crate::process::Process;
use crate::state::ShellState;

const LOOPBACK: &str = "127.0.0.1";
const LOCAL_ADDR: &str = "10.0.2.15";
const NETWORK_LATENCY: Duration = Duration::from_millis(250);

/// Register process and network commands.
pub fn register_system_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(PsCmd));
    reg.register(Box::new(KillCmd));
    reg.register(Box::new(TopCmd));
    reg.register(Box::new(JobsCmd));
    reg.register(Box::new(PingCmd));
    reg.register(Box::new(CurlCmd));
    reg.register(Box::new(WgetCmd));
    reg.register(Box::new(NetstatCmd));
    reg.register(Box::new(IfconfigCmd));
}

fn uptime_label(started_at: i64) -> String {
    let secs = (now_ms() - started_at).max(0) / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

// ---------------------------------------------------------------------------
// ps
// ---------------------------------------------------------------------------

struct PsCmd;
impl Command for PsCmd {
    fn name(&self) -> &str {
        "ps"
    }
    fn description(&self) -> &str {
        "List running processes"
    }
    fn usage(&self) -> &str {
        "ps [aux]"
    }
    fn category(&self) -> Category {
        Category::Process
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let full = args.iter().any(|a| a.contains('a') || a.contains('u'));
        let (headers, rows): (Vec<&str>, Vec<Vec<String>>) = if full {
            (
                vec!["USER", "PID", "%CPU", "MEM", "TIME", "COMMAND"],
                state
                    .processes
                    .list()
                    .map(|p| {
                        vec![
                            state.user.clone(),
                            p.pid.to_string(),
                            format!("{:.1}", p.cpu),
                            format!("{}M", p.mem_mb),
                            uptime_label(p.started_at),
                            p.command.clone(),
                        ]
                    })
                    .collect(),
            )
        } else {
            (
                vec!["PID", "TIME", "CMD"],
                state
                    .processes
                    .list()
                    .map(|p| vec![p.pid.to_string(), uptime_label(p.started_at), p.name.clone()])
                    .collect(),
            )
        };
        Ok(CommandOutput::Table {
            headers: headers.into_iter().map(String::from).collect(),
            rows,
        })
    }
}

// ---------------------------------------------------------------------------
// kill
// ---------------------------------------------------------------------------

struct KillCmd;

impl KillCmd {
    /// Resolve `1234`, `%1` (job number) or `:3000` (listening port).
    fn target(spec: &str, state: &ShellState) -> Result<u32> {
        if let Some(job) = spec.strip_prefix('%') {
            let n: usize = job
                .parse()
                .map_err(|_| DevtermError::Command(format!("kill: {spec}: no such job")))?;
            return state
                .processes
                .jobs()
                .nth(n.wrapping_sub(1))
                .map(|p| p.pid)
                .ok_or_else(|| DevtermError::Command(format!("kill: {spec}: no such job")));
        }
        if let Some(port) = spec.strip_prefix(':') {
            let port: u16 = port
                .parse()
                .map_err(|_| DevtermError::Command(format!("kill: invalid port: {port}")))?;
            return state
                .processes
                .find_by_port(port)
                .map(|p| p.pid)
                .ok_or_else(|| {
                    DevtermError::Command(format!("kill: nothing listening on port {port}"))
                });
        }
        spec.parse().map_err(|_| {
            DevtermError::Command(format!(
                "kill: {spec}: arguments must be process or job IDs"
            ))
        })
    }
}

impl Command for KillCmd {
    fn name(&self) -> &str {
        "kill"
    }
    fn description(&self) -> &str {
        "Terminate a process"
    }
    fn usage(&self) -> &str {
        "kill [-9] <pid|%job|:port>..."
    }
    fn category(&self) -> Category {
        Category::Process
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let specs: Vec<&str> = args
            .iter()
            .copied()
            .filter(|a| !(a.starts_with('-') && a[1..].chars().all(|c| c.is_ascii_alphanumeric())))
            .collect();
        if specs.is_empty() {
            return Err(DevtermError::usage(self.usage()));
        }
        let mut out = CommandOutput::lines();
        for spec in specs {
            let pid = Self::target(spec, state)?;
            if pid == crate::process::SHELL_PID {
                return Err(DevtermError::Command(format!(
                    "kill: ({pid}) - Operation not permitted"
                )));
            }
            match state.processes.kill(pid) {
                Some(p) => out.push(
                    OutputLevel::Success,
                    format!("[{}]  Terminated  {}", p.pid, p.command),
                ),
                None => {
                    return Err(DevtermError::Command(format!(
                        "kill: ({pid}) - No such process"
                    )));
                },
            }
        }
        Ok(out.build())
    }
}

// ---------------------------------------------------------------------------
// top
// ---------------------------------------------------------------------------

struct TopCmd;
impl Command for TopCmd {
    fn name(&self) -> &str {
        "top"
    }
    fn description(&self) -> &str {
        "Show processes ordered by CPU usage"
    }
    fn usage(&self) -> &str {
        "top [-n count]"
    }
    fn category(&self) -> Category {
        Category::Process
    }
    fn aliases(&self) -> &[&str] {
        &["htop"]
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let limit = match flag_value(args, "-n") {
            Some(n) => n
                .parse::<usize>()
                .map_err(|_| DevtermError::Command(format!("top: invalid count: {n}")))?,
            None => usize::MAX,
        };
        let mut procs: Vec<&Process> = state.processes.list().collect();
        procs.sort_by(|a, b| b.cpu.total_cmp(&a.cpu).then(a.pid.cmp(&b.pid)));
        let cpu: f32 = procs.iter().map(|p| p.cpu).sum();
        let mem: u32 = procs.iter().map(|p| p.mem_mb).sum();

        let mut lines = vec![
            format!(
                "top - {} up {}, 1 user",
                format_clock(now_ms()),
                uptime_label(state.started_at)
            ),
            format!("Tasks: {} total, {} running", procs.len(), procs.len()),
            format!("%Cpu(s): {cpu:.1} us   MiB Mem: {mem} used"),
            String::new(),
            format!("{:>6}  {:>5}  {:>6}  {}", "PID", "%CPU", "MEM", "COMMAND"),
        ];
        for p in procs.into_iter().take(limit) {
            lines.push(format!(
                "{:>6}  {:>5.1}  {:>5}M  {}",
                p.pid, p.cpu, p.mem_mb, p.command
            ));
        }
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// jobs
// ---------------------------------------------------------------------------

struct JobsCmd;
impl Command for JobsCmd {
    fn name(&self) -> &str {
        "jobs"
    }
    fn description(&self) -> &str {
        "List background jobs"
    }
    fn usage(&self) -> &str {
        "jobs [-l]"
    }
    fn category(&self) -> Category {
        Category::Process
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let long = args.contains(&"-l");
        let jobs: Vec<&Process> = state.processes.jobs().collect();
        let last = jobs.len();
        let lines: Vec<String> = jobs
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let marker = if i + 1 == last { '+' } else { '-' };
                if long {
                    format!("[{}]{marker}  {:<6} Running    {} &", i + 1, p.pid, p.command)
                } else {
                    format!("[{}]{marker}  Running    {} &", i + 1, p.command)
                }
            })
            .collect();
        if lines.is_empty() {
            return Ok(CommandOutput::None);
        }
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// URLs and hosts
// ---------------------------------------------------------------------------

/// A parsed `http(s)://host[:port]/path` URL.
#[derive(Debug, Clone, PartialEq)]
struct Url {
    scheme: String,
    host: String,
    port: Option<u16>,
    path: String,
}

impl Url {
    /// Parse a URL; a missing scheme means `http`.
    fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (scheme, rest) = match input.find("://") {
            Some(i) => (input[..i].to_lowercase(), &input[i + 3..]),
            None => ("http".to_string(), input),
        };
        if !matches!(scheme.as_str(), "http" | "https") {
            return None;
        }
        let rest = rest.split(['#', '?']).next().unwrap_or(rest);
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rfind(':') {
            Some(i) => (&authority[..i], Some(authority[i + 1..].parse::<u16>().ok()?)),
            None => (authority, None),
        };
        if host.is_empty() {
            return None;
        }
        Some(Self {
            scheme,
            host: host.to_lowercase(),
            port,
            path: path.to_string(),
        })
    }

    fn effective_port(&self) -> u16 {
        self.port
            .unwrap_or(if self.scheme == "https" { 443 } else { 80 })
    }

    fn is_local(&self) -> bool {
        matches!(self.host.as_str(), "localhost" | "127.0.0.1" | "0.0.0.0")
    }

    /// Last path segment, or `index.html`.
    fn file_name(&self) -> &str {
        self.path
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("index.html")
    }
}

/// Stable fake address for a hostname; `None` for unresolvable names.
fn resolve_host(host: &str) -> Option<String> {
    if matches!(host, "localhost" | "0.0.0.0") {
        return Some(LOOPBACK.to_string());
    }
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Some(ip.to_string());
    }
    let valid = host.contains('.')
        && host
            .split('.')
            .all(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
    if !valid {
        return None;
    }
    let h = host
        .bytes()
        .fold(2166136261u32, |acc, b| (acc ^ u32::from(b)).wrapping_mul(16777619));
    let [a, b, c, d] = h.to_be_bytes();
    Some(format!("{}.{}.{}.{}", 93 + a % 100, b, c, d.max(1)))
}

/// A simulated HTTP response.
struct Response {
    status: u16,
    content_type: &'static str,
    body: String,
}

impl Response {
    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            201 => "Created",
            404 => "Not Found",
            _ => "OK",
        }
    }

    fn headers(&self) -> Vec<String> {
        vec![
            format!("HTTP/1.1 {} {}", self.status, self.reason()),
            format!("Content-Type: {}", self.content_type),
            format!("Content-Length: {}", self.body.len()),
        ]
    }
}

fn fetch(url: &Url, method: &str, data: Option<&str>, state: &mut ShellState) -> Result<Response> {
    let port = url.effective_port();
    if url.is_local() {
        let Some(server) = state.processes.find_by_port(port) else {
            return Err(DevtermError::Command(format!(
                "curl: (7) Failed to connect to {} port {port}: Connection refused",
                url.host
            )));
        };
        let server_pid = server.pid;
        let served = if server.name == "serve" {
            server.command.split_whitespace().nth(1).map(String::from)
        } else {
            state.project_root().ok().map(|root| {
                if server.command.contains("preview") {
                    format!("{root}/dist")
                } else {
                    root
                }
            })
        };
        let root = served.unwrap_or_else(|| state.cwd.clone());
        let rel = if url.path.ends_with('/') {
            format!("{}index.html", url.path)
        } else {
            url.path.clone()
        };
        let file = format!("{}{rel}", root.trim_end_matches('/'));
        log::debug!("curl: pid {server_pid} serving {file}");
        return Ok(match state.vfs.read_to_string(&file) {
            Ok(body) => Response {
                status: 200,
                content_type: if file.ends_with(".json") {
                    "application/json"
                } else if file.ends_with(".js") {
                    "text/javascript"
                } else {
                    "text/html"
                },
                body,
            },
            Err(_) if url.path == "/" => Response {
                status: 200,
                content_type: "text/html",
                body: "<!doctype html>\n<html><body><div id=\"root\"></div></body></html>".to_string(),
            },
            Err(_) => Response {
                status: 404,
                content_type: "text/plain",
                body: "Not Found".to_string(),
            },
        });
    }

    if resolve_host(&url.host).is_none() {
        return Err(DevtermError::Command(format!(
            "curl: (6) Could not resolve host: {}",
            url.host
        )));
    }
    let api = url.host.starts_with("api.") || url.path.starts_with("/api");
    Ok(if api {
        let body = serde_json::json!({
            "method": method,
            "url": format!("{}://{}{}", url.scheme, url.host, url.path),
            "data": data,
            "status": "ok",
        });
        Response {
            status: if method == "POST" { 201 } else { 200 },
            content_type: "application/json",
            body: serde_json::to_string_pretty(&body)?,
        }
    } else {
        Response {
            status: 200,
            content_type: "text/html",
            body: format!(
                "<!doctype html>\n<html>\n<head><title>{0}</title></head>\n<body><h1>{0}</h1></body>\n</html>",
                url.host
            ),
        }
    })
}

// ---------------------------------------------------------------------------
// ping
// ---------------------------------------------------------------------------

struct PingCmd;
impl Command for PingCmd {
    fn name(&self) -> &str {
        "ping"
    }
    fn description(&self) -> &str {
        "Send ICMP echo requests to a host"
    }
    fn usage(&self) -> &str {
        "ping [-c count] <host>"
    }
    fn category(&self) -> Category {
        Category::Network
    }
    fn latency(&self, args: &[&str]) -> Duration {
        let count = flag_value(args, "-c")
            .and_then(|c| c.parse::<u32>().ok())
            .unwrap_or(4)
            .min(10);
        NETWORK_LATENCY * count
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let count = match flag_value(args, "-c") {
            Some(c) => match c.parse::<u32>() {
                Ok(n) if (1..=100).contains(&n) => n,
                _ => return Err(DevtermError::Command(format!("ping: invalid count: {c}"))),
            },
            None => 4,
        };
        let host = args
            .iter()
            .enumerate()
            .find(|(i, a)| !a.starts_with('-') && (*i == 0 || args[i - 1] != "-c"))
            .map(|(_, a)| *a)
            .ok_or_else(|| DevtermError::usage(self.usage()))?;
        let host = if host == state.hostname { "localhost" } else { host };
        let ip = resolve_host(host).ok_or_else(|| {
            DevtermError::Command(format!("ping: cannot resolve {host}: Unknown host"))
        })?;

        let (base, spread) = if ip == LOOPBACK { (0.04, 0.01) } else { (12.0, 0.9) };
        let seed = ip.bytes().fold(0u32, |a, b| a.wrapping_add(u32::from(b)));
        let mut out = CommandOutput::lines().info(format!("PING {host} ({ip}): 56 data bytes"));
        let mut times = Vec::new();
        for seq in 0..count {
            let time = base + f64::from((seed + seq * 7) % 10) * spread;
            times.push(time);
            out.push(
                OutputLevel::Info,
                format!("64 bytes from {ip}: icmp_seq={seq} ttl=64 time={time:.3} ms"),
            );
        }
        let min = times.iter().copied().fold(f64::MAX, f64::min);
        let max = times.iter().copied().fold(0.0, f64::max);
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        Ok(out
            .info("")
            .info(format!("--- {host} ping statistics ---"))
            .success(format!(
                "{count} packets transmitted, {count} packets received, 0.0% packet loss"
            ))
            .info(format!("round-trip min/avg/max = {min:.3}/{avg:.3}/{max:.3} ms"))
            .build())
    }
}

// ---------------------------------------------------------------------------
// curl
// ---------------------------------------------------------------------------

struct CurlCmd;
impl Command for CurlCmd {
    fn name(&self) -> &str {
        "curl"
    }
    fn description(&self) -> &str {
        "Transfer data from a URL"
    }
    fn usage(&self) -> &str {
        "curl [-I] [-X method] [-d data] [-o file] <url>"
    }
    fn category(&self) -> Category {
        Category::Network
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        NETWORK_LATENCY
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let mut head = false;
        let mut include = false;
        let mut method: Option<String> = None;
        let mut data: Option<&str> = None;
        let mut output: Option<&str> = None;
        let mut target: Option<&str> = None;
        let mut iter = args.iter();
        while let Some(&arg) = iter.next() {
            match arg {
                "-I" | "--head" => head = true,
                "-i" | "--include" => include = true,
                "-s" | "--silent" | "-L" | "--location" => {},
                "-X" | "--request" => method = iter.next().map(|m| m.to_uppercase()),
                "-d" | "--data" => data = iter.next().copied(),
                "-o" | "--output" => output = iter.next().copied(),
                "-H" | "--header" => {
                    iter.next();
                },
                a if a.starts_with('-') => {
                    return Err(DevtermError::Command(format!("curl: option {a}: is unknown")));
                },
                a => target = Some(a),
            }
        }
        let target = target.ok_or_else(|| {
            DevtermError::Command("curl: no URL specified!".to_string())
        })?;
        let url = Url::parse(target).ok_or_else(|| {
            DevtermError::Command(format!("curl: (3) URL rejected: Malformed input: {target}"))
        })?;
        let method = method.unwrap_or_else(|| {
            if head {
                "HEAD".to_string()
            } else if data.is_some() {
                "POST".to_string()
            } else {
                "GET".to_string()
            }
        });

        let response = fetch(&url, &method, data, state)?;
        if head {
            return Ok(CommandOutput::Text(response.headers().join("\n")));
        }
        if let Some(file) = output {
            let path = state.resolve(file);
            state.vfs.write(&path, &response.body)?;
            return Ok(CommandOutput::text(format!(
                "  % Total    % Received\n100 {:>6}  100 {:>6}  -> {path}",
                response.body.len(),
                response.body.len()
            )));
        }
        let mut text = String::new();
        if include {
            text.push_str(&response.headers().join("\n"));
            text.push_str("\n\n");
        }
        text.push_str(&response.body);
        Ok(CommandOutput::Text(text))
    }
}

// ---------------------------------------------------------------------------
// wget
// ---------------------------------------------------------------------------

struct WgetCmd;
impl Command for WgetCmd {
    fn name(&self) -> &str {
        "wget"
    }
    fn description(&self) -> &str {
        "Download a file into the current directory"
    }
    fn usage(&self) -> &str {
        "wget [-O file] <url>"
    }
    fn category(&self) -> Category {
        Category::Network
    }
    fn latency(&self, _args: &[&str]) -> Duration {
        NETWORK_LATENCY * 2
    }
    fn execute(&self, args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let out_name = flag_value(args, "-O");
        let target = args
            .iter()
            .enumerate()
            .find(|(i, a)| !a.starts_with('-') && (*i == 0 || args[i - 1] != "-O"))
            .map(|(_, a)| *a)
            .ok_or_else(|| DevtermError::usage(self.usage()))?;
        let url = Url::parse(target)
            .ok_or_else(|| DevtermError::Command(format!("{target}: Invalid URL")))?;
        let ip = resolve_host(&url.host).ok_or_else(|| {
            DevtermError::Command(format!(
                "wget: unable to resolve host address '{}'",
                url.host
            ))
        })?;
        let response = fetch(&url, "GET", None, state)
            .map_err(|e| DevtermError::Command(e.to_string().replace("curl:", "wget:")))?;
        if response.status >= 400 {
            return Err(DevtermError::Command(format!(
                "ERROR {}: {}.",
                response.status,
                response.reason()
            )));
        }
        let path = state.resolve(out_name.unwrap_or_else(|| url.file_name()));
        state.vfs.write(&path, &response.body)?;
        let name = devterm_vfs::file_name(&path).to_string();
        Ok(CommandOutput::lines()
            .info(format!("Connecting to {} ({ip})... connected.", url.host))
            .info(format!(
                "HTTP request sent, awaiting response... {} {}",
                response.status,
                response.reason()
            ))
            .info(format!("Saving to: '{name}'"))
            .success(format!("'{name}' saved [{}]", response.body.len()))
            .build())
    }
}

// ---------------------------------------------------------------------------
// netstat
// ---------------------------------------------------------------------------

struct NetstatCmd;
impl Command for NetstatCmd {
    fn name(&self) -> &str {
        "netstat"
    }
    fn description(&self) -> &str {
        "Show listening ports"
    }
    fn usage(&self) -> &str {
        "netstat [-tlnp]"
    }
    fn category(&self) -> Category {
        Category::Network
    }
    fn aliases(&self) -> &[&str] {
        &["ss"]
    }
    fn execute(&self, _args: &[&str], state: &mut ShellState) -> Result<CommandOutput> {
        let rows = state
            .processes
            .list()
            .filter_map(|p| {
                let port = p.port?;
                Some(vec![
                    "tcp".to_string(),
                    format!("0.0.0.0:{port}"),
                    "0.0.0.0:*".to_string(),
                    "LISTEN".to_string(),
                    format!("{}/{}", p.pid, p.name),
                ])
            })
            .collect();
        Ok(CommandOutput::Table {
            headers: ["Proto", "Local Address", "Foreign Address", "State", "PID/Program"]
                .into_iter()
                .map(String::from)
                .collect(),
            rows,
        })
    }
}

// ---------------------------------------------------------------------------
// ifconfig
// ---------------------------------------------------------------------------

struct IfconfigCmd;
impl Command for IfconfigCmd {
    fn name(&self) -> &str {
        "ifconfig"
    }
    fn description(&self) -> &str {
        "Show network interfaces"
    }
    fn usage(&self) -> &str {
        "ifconfig [interface]"
    }
    fn category(&self) -> Category {
        Category::Network
    }
    fn aliases(&self) -> &[&str] {
        &["ip"]
    }
    fn execute(&self, args: &[&str], _state: &mut ShellState) -> Result<CommandOutput> {
        let eth0 = [
            "eth0: flags=4163<UP,BROADCAST,RUNNING,MULTICAST>  mtu 1500".to_string(),
            format!("        inet {LOCAL_ADDR}  netmask 255.255.255.0  broadcast 10.0.2.255"),
            "        ether 52:54:00:12:34:56  txqueuelen 1000  (Ethernet)".to_string(),
        ];
        let lo = [
            "lo: flags=73<UP,LOOPBACK,RUNNING>  mtu 65536".to_string(),
            format!("        inet {LOOPBACK}  netmask 255.0.0.0"),
            "        loop  txqueuelen 1000  (Local Loopback)".to_string(),
        ];
        let blocks: Vec<String> = match positional(args).first() {
            None | Some(&"addr") | Some(&"a") => vec![eth0.join("\n"), lo.join("\n")],
            Some(&"eth0") => vec![eth0.join("\n")],
            Some(&"lo") => vec![lo.join("\n")],
            Some(other) => {
                return Err(DevtermError::Command(format!(
                    "{other}: error fetching interface information: Device not found"
                )));
            },
        };
        Ok(CommandOutput::Text(blocks.join("\n\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (CommandRegistry, ShellState) {
        (CommandRegistry::with_builtins(), ShellState::in_memory().unwrap())
    }

    fn exec(reg: &CommandRegistry, state: &mut ShellState, line: &str) -> Result<CommandOutput> {
        reg.execute(line, state)
    }

    fn text(out: CommandOutput) -> String {
        out.render()
    }

    #[test]
    fn ps_lists_shell_and_servers() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "ps").unwrap());
        assert!(out.starts_with("PID"));
        assert!(out.contains("devsh"));
        exec(&reg, &mut st, "serve -p 8080").unwrap();
        let aux = text(exec(&reg, &mut st, "ps aux").unwrap());
        assert!(aux.contains("serve /home/developer/project -p 8080"));
        assert!(aux.starts_with("USER"));
    }

    #[test]
    fn kill_by_pid_job_and_port() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "serve -p 8080").unwrap();
        exec(&reg, &mut st, "serve -p 8081").unwrap();
        exec(&reg, &mut st, "serve -p 8082").unwrap();
        let out = text(exec(&reg, &mut st, "kill 1024").unwrap());
        assert!(out.starts_with("[1024]  Terminated"));
        exec(&reg, &mut st, "kill %1").unwrap();
        assert!(st.processes.get(1025).is_none());
        exec(&reg, &mut st, "kill -9 :8082").unwrap();
        assert_eq!(st.processes.len(), 1);
    }

    #[test]
    fn kill_errors() {
        let (reg, mut st) = setup();
        assert!(matches!(exec(&reg, &mut st, "kill"), Err(DevtermError::Usage(_))));
        assert!(exec(&reg, &mut st, "kill 1")
            .unwrap_err()
            .to_string()
            .contains("Operation not permitted"));
        assert!(exec(&reg, &mut st, "kill 4242")
            .unwrap_err()
            .to_string()
            .contains("No such process"));
        assert!(exec(&reg, &mut st, "kill abc").is_err());
        assert!(exec(&reg, &mut st, "kill %3").is_err());
    }

    #[test]
    fn top_orders_by_cpu() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "dev").unwrap();
        let out = text(exec(&reg, &mut st, "top -n 1").unwrap());
        let rows: Vec<&str> = out.lines().skip(5).collect();
        assert_eq!(rows.len(), 1);
        assert!(out.lines().nth(1).unwrap().starts_with("Tasks: 2 total"));
    }

    #[test]
    fn jobs_lists_background() {
        let (reg, mut st) = setup();
        assert_eq!(text(exec(&reg, &mut st, "jobs").unwrap()), "");
        exec(&reg, &mut st, "dev").unwrap();
        assert_eq!(
            text(exec(&reg, &mut st, "jobs").unwrap()),
            "[1]+  Running    vite --port 5173 &"
        );
    }

    #[test]
    fn ping_counts() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "ping -c 2 localhost").unwrap());
        assert!(out.starts_with("PING localhost (127.0.0.1): 56 data bytes"));
        assert!(out.contains("icmp_seq=1"));
        assert!(!out.contains("icmp_seq=2"));
        assert!(out.contains("2 packets transmitted, 2 packets received"));
        assert!(exec(&reg, &mut st, "ping nowhere").is_err());
        assert!(exec(&reg, &mut st, "ping -c 0 example.com").is_err());
        assert!(matches!(exec(&reg, &mut st, "ping"), Err(DevtermError::Usage(_))));
    }

    #[test]
    fn curl_local_server() {
        let (reg, mut st) = setup();
        let err = exec(&reg, &mut st, "curl http://localhost:3000").unwrap_err();
        assert!(err.to_string().contains("Connection refused"));
        exec(&reg, &mut st, "serve -p 3000").unwrap();
        let body = text(exec(&reg, &mut st, "curl localhost:3000/README.md").unwrap());
        assert!(body.starts_with("# my-app"));
        let head = text(exec(&reg, &mut st, "curl -I localhost:3000/missing").unwrap());
        assert!(head.starts_with("HTTP/1.1 404 Not Found"));
    }

    #[test]
    fn curl_remote_api() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "curl -X POST -d name=x https://api.example.com/users").unwrap());
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["method"], "POST");
        assert_eq!(json["data"], "name=x");
        assert!(exec(&reg, &mut st, "curl https://nohost").is_err());
        assert!(exec(&reg, &mut st, "curl ftp://example.com").is_err());
        exec(&reg, &mut st, "curl -o page.html https://example.com").unwrap();
        assert!(st.vfs.exists("/home/developer/project/page.html"));
    }

    #[test]
    fn wget_saves_file() {
        let (reg, mut st) = setup();
        let out = text(exec(&reg, &mut st, "wget https://example.com/files/data.json").unwrap());
        assert!(out.ends_with("]"));
        assert!(st.vfs.exists("/home/developer/project/data.json"));
        exec(&reg, &mut st, "wget -O home.html https://example.com/").unwrap();
        assert!(st.vfs.exists("/home/developer/project/home.html"));
    }

    #[test]
    fn netstat_shows_listeners() {
        let (reg, mut st) = setup();
        exec(&reg, &mut st, "serve -p 8080").unwrap();
        let out = text(exec(&reg, &mut st, "netstat -tlnp").unwrap());
        assert!(out.contains("0.0.0.0:8080"));
        assert!(out.contains("1024/serve"));
    }

    #[test]
    fn ifconfig_interfaces() {
        let (reg, mut st) = setup();
        assert!(text(exec(&reg, &mut st, "ifconfig").unwrap()).contains("inet 127.0.0.1"));
        assert!(!text(exec(&reg, &mut st, "ifconfig eth0").unwrap()).contains("lo:"));
        assert!(exec(&reg, &mut st, "ifconfig wlan9").is_err());
    }

    #[test]
    fn url_parsing() {
        let url = Url::parse("https://Example.com:8443/a/b.txt?q=1").unwrap();
        assert_eq!(url.host, "example.com");
        assert_eq!(url.port, Some(8443));
        assert_eq!(url.path, "/a/b.txt");
        assert_eq!(url.file_name(), "b.txt");
        assert_eq!(Url::parse("localhost:3000").unwrap().effective_port(), 3000);
        assert_eq!(Url::parse("http://example.com").unwrap().file_name(), "index.html");
        assert!(Url::parse("http://host:notaport/").is_none());
    }

    #[test]
    fn hosts_resolve_stably() {
        assert_eq!(resolve_host("localhost").as_deref(), Some(LOOPBACK));
        assert_eq!(resolve_host("10.1.2.3").as_deref(), Some("10.1.2.3"));
        assert_eq!(resolve_host("example.com"), resolve_host("example.com"));
        assert!(resolve_host("nohost").is_none());
    }
}
