//! HTML pages served to viewers, rendered with `minijinja`.
//!
//! Template names end in `.html` so values are HTML-escaped. The upgrade
//! URL lands inside a script block and goes through `tojson`.

use minijinja::{context, Environment};

const HOME_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<frameset rows="80%,20%">
    <frame src="/data" name="viewer" id="viewer">
    <frame src="/fire" name="controls" id="controls">
</frameset>
</html>
"#;

const DATA_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8">
        <title>tickrelay</title>
    </head>
    <body>
        <pre id="fileData">{{ data }}</pre>
        <script type="text/javascript">
            (function() {
                var data = document.getElementById("fileData");
                var conn = new WebSocket({{ ws_url|tojson }});
                conn.onclose = function(evt) {
                    data.textContent = 'Connection closed';
                }
                conn.onmessage = function(evt) {
                    data.textContent = evt.data;
                }
            })();
        </script>
    </body>
</html>
"#;

const FIRE_HTML: &str = r#"<html><form action="/load"><input type="submit" value="Populate Stream"></form></html>"#;

/// The compiled page templates.
pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    /// Compile all page templates.
    ///
    /// # Errors
    ///
    /// Returns a [`minijinja::Error`] if a template does not parse.
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("home.html", HOME_HTML)?;
        env.add_template("data.html", DATA_HTML)?;
        env.add_template("fire.html", FIRE_HTML)?;
        Ok(Self { env })
    }

    /// The frameset page holding the viewer and the controls.
    ///
    /// # Errors
    ///
    /// Returns a [`minijinja::Error`] if rendering fails.
    pub fn home(&self) -> Result<String, minijinja::Error> {
        self.env.get_template("home.html")?.render(context! {})
    }

    /// The viewer page: the current payload plus a script that opens the
    /// update socket at `ws://<host>/ws?lastMod=<last_mod>`.
    ///
    /// # Errors
    ///
    /// Returns a [`minijinja::Error`] if rendering fails.
    pub fn data(&self, host: &str, data: &str, last_mod: &str) -> Result<String, minijinja::Error> {
        let ws_url = format!("ws://{host}/ws?lastMod={last_mod}");
        self.env
            .get_template("data.html")?
            .render(context! { data => data, ws_url => ws_url })
    }

    /// The "Populate Stream" control.
    ///
    /// # Errors
    ///
    /// Returns a [`minijinja::Error`] if rendering fails.
    pub fn fire(&self) -> Result<String, minijinja::Error> {
        self.env.get_template("fire.html")?.render(context! {})
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn data_page_embeds_upgrade_url() {
        let pages = Pages::new().unwrap();
        let html = pages.data("localhost:8080", "1-0 => 1\n", "3b9aca00").unwrap();
        assert!(html.contains(r#"new WebSocket("ws://localhost:8080/ws?lastMod=3b9aca00")"#));
        assert!(html.contains("<pre id=\"fileData\">1-0 =&gt; 1\n</pre>"));
    }

    #[test]
    fn data_page_escapes_hostile_host() {
        let pages = Pages::new().unwrap();
        let html = pages.data("evil</script><script>", "x", "0").unwrap();
        assert!(!html.contains("</script><script>"));
    }

    #[test]
    fn home_page_frames_viewer_and_controls() {
        let pages = Pages::new().unwrap();
        let html = pages.home().unwrap();
        assert!(html.contains(r#"src="/data""#));
        assert!(html.contains(r#"src="/fire""#));
    }

    #[test]
    fn fire_page_posts_to_load() {
        let pages = Pages::new().unwrap();
        assert!(pages.fire().unwrap().contains(r#"action="/load""#));
    }
}
