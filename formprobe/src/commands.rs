use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("formprobe")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("formprobe")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and progress output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("scan")
                .about(
                    "Crawl a site, then probe every form it finds for reflected XSS, SQL error \
                messages and missing CSRF tokens. Use only on targets you are authorized to test.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The URL to start crawling from")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"max-pages" <NUM>)
                        .required(false)
                        .help("Maximum number of pages to crawl")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"i-understand")
                        .required(false)
                        .help("Confirm you have permission to scan a target outside the demo site")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"ignore-robots")
                        .required(false)
                        .help("Do not fetch or honor robots.txt")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"payloads-dir" <PATH>)
                        .required(false)
                        .help("Directory holding xss.json and sqli.json (default: bundled payloads)"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Where to write the JSON report")
                        .default_value("report.json"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of concurrent requests during crawling and probing.")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("1"),
                )
                .arg(
                    arg!(--"delay-ms" <MILLIS>)
                        .required(false)
                        .help("Minimum delay between page fetches while crawling")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("1000"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds (0 disables it)")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"retries" <NUM>)
                        .required(false)
                        .help("Retries for requests that fail on the network")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("0"),
                )
                .arg(arg!(-v --"verbose" "Log every request").required(false)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_defaults() {
        let matches = command_argument_builder()
            .try_get_matches_from(["formprobe", "scan", "-u", "http://testphp.vulnweb.com/"])
            .unwrap();
        let (name, scan) = matches.subcommand().unwrap();
        assert_eq!(name, "scan");
        assert_eq!(scan.get_one::<usize>("max-pages"), Some(&30));
        assert_eq!(scan.get_one::<usize>("threads"), Some(&1));
        assert_eq!(scan.get_one::<u64>("delay-ms"), Some(&1000));
        assert_eq!(scan.get_one::<String>("output").map(String::as_str), Some("report.json"));
        assert!(!scan.get_flag("i-understand"));
        assert!(!scan.get_flag("ignore-robots"));
    }

    #[test]
    fn test_scan_requires_url() {
        assert!(command_argument_builder()
            .try_get_matches_from(["formprobe", "scan"])
            .is_err());
        assert!(command_argument_builder()
            .try_get_matches_from(["formprobe", "scan", "-u", "not a url"])
            .is_err());
    }
}
