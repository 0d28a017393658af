//! Interactive authorization step on the terminal.

use async_trait::async_trait;
use ss3link_oauth::AuthorizationPrompt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Prints the authorization URL and reads the pasted code from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl StdinPrompt {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuthorizationPrompt for StdinPrompt {
    async fn prompt(&self, authorization_url: &str) -> Option<String> {
        println!("SimpliSafe Authentication");
        println!("=========================");
        println!();
        println!("Open this URL in your browser and sign in:");
        println!();
        println!("  {}", authorization_url);
        println!();
        println!("The browser ends on a page it cannot open (com.simplisafe.mobile://...).");
        println!("Copy that address, or just its code= value, and paste it here:");
        println!();

        if open_url(authorization_url).is_err() {
            println!("(Could not open browser automatically)");
            println!();
        }

        let mut stdout = tokio::io::stdout();
        if stdout.write_all(b"code> ").await.is_err() || stdout.flush().await.is_err() {
            return None;
        }

        let mut input = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut input).await {
            Ok(0) | Err(_) => None,
            Ok(_) => extract_code(&input),
        }
    }
}

/// Accept either the bare code or the full redirect address.
pub fn extract_code(input: &str) -> Option<String> {
    let input = input.trim();
    let code = match input.find("code=") {
        Some(start) => {
            let rest = &input[start + "code=".len()..];
            rest.split(['&', '#']).next().unwrap_or(rest)
        }
        None => input,
    };
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

/// Try to open a URL in the default browser.
fn open_url(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).status()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).status()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .status()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bare_code() {
        assert_eq!(extract_code("  abc123\n").as_deref(), Some("abc123"));
    }

    #[test]
    fn test_extract_from_redirect() {
        let url = "com.simplisafe.mobile://auth.simplisafe.com/ios/com.simplisafe.mobile/callback?code=XyZ-1&state=s";
        assert_eq!(extract_code(url).as_deref(), Some("XyZ-1"));
    }

    #[test]
    fn test_extract_empty() {
        assert_eq!(extract_code("\n"), None);
        assert_eq!(extract_code("...?code=&state=s"), None);
    }
}
