/// 工具函数集合

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::error;

use crate::constants::INVALID_VM_CONSOLE_PARAMS_MESSAGE;
use crate::errors::{Error, Result};

static HOST_RE: Lazy<Regex> = Lazy::new(|| query_param_regex("host"));
static PORT_RE: Lazy<Regex> = Lazy::new(|| query_param_regex("port"));
static TICKET_RE: Lazy<Regex> = Lazy::new(|| query_param_regex("ticket"));

fn query_param_regex(name: &str) -> Regex {
    Regex::new(&format!(r"(?:^|&){}=([^&]+)", name)).expect("静态正则表达式必须合法")
}

/// 控制台页面需要的三个参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleParams {
    pub host: String,
    pub port: String,
    pub ticket: String,
}

/// 从原始查询字符串中提取 host / port / ticket
///
/// 每个参数必须恰好出现一次，否则视为非法请求（400）
pub fn extract_console_query_params(query: &str) -> Result<ConsoleParams> {
    Ok(ConsoleParams {
        host: single_capture(&HOST_RE, query)?,
        port: single_capture(&PORT_RE, query)?,
        ticket: single_capture(&TICKET_RE, query)?,
    })
}

fn single_capture(re: &Regex, query: &str) -> Result<String> {
    let mut values = re.captures_iter(query).filter_map(|c| c.get(1));
    match (values.next(), values.next()) {
        (Some(value), None) => Ok(value.as_str().to_string()),
        _ => {
            error!(query = %query, "{}", INVALID_VM_CONSOLE_PARAMS_MESSAGE);
            Err(Error::InvalidQueryParams {
                message: INVALID_VM_CONSOLE_PARAMS_MESSAGE.to_string(),
                status: 400,
            })
        }
    }
}

/// 生成网关自身的控制台页面链接
pub fn build_console_link(hostname: &str, host: &str, port: &str, ticket: &str) -> String {
    format!(
        "{}/console?host={}&port={}&ticket={}",
        hostname.trim_end_matches('/'),
        host,
        port,
        ticket
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_console_query_params() {
        let params = extract_console_query_params("host=1.2.3.4&port=9&ticket=abc").unwrap();
        assert_eq!(
            params,
            ConsoleParams {
                host: "1.2.3.4".to_string(),
                port: "9".to_string(),
                ticket: "abc".to_string(),
            }
        );
    }

    #[test]
    fn test_extract_console_query_params_any_order() {
        let params = extract_console_query_params("ticket=t0k&host=h&port=443").unwrap();
        assert_eq!(params.host, "h");
        assert_eq!(params.port, "443");
        assert_eq!(params.ticket, "t0k");
    }

    #[test]
    fn test_missing_ticket_rejected() {
        let err = extract_console_query_params("host=1.2.3.4&port=9").unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), INVALID_VM_CONSOLE_PARAMS_MESSAGE);
    }

    #[test]
    fn test_duplicate_param_rejected() {
        assert!(extract_console_query_params("host=a&host=b&port=1&ticket=t").is_err());
        assert!(extract_console_query_params("host=&port=1&ticket=t").is_err());
        assert!(extract_console_query_params("").is_err());
    }

    #[test]
    fn test_similar_names_do_not_match() {
        // vhost 不是 host
        assert!(extract_console_query_params("vhost=a&port=1&ticket=t").is_err());
    }

    #[test]
    fn test_build_console_link() {
        assert_eq!(
            build_console_link("https://gw.example.com/", "10.0.0.1", "443", "abc"),
            "https://gw.example.com/console?host=10.0.0.1&port=443&ticket=abc"
        );
    }
}
