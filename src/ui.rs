use crate::models::DashboardView;

pub fn render_index(view: &DashboardView) -> String {
    let timezone = script_string(&view.timezone);
    let next_refresh = view
        .next_refresh_at
        .map(|next| next.timestamp_millis().to_string())
        .unwrap_or_else(|| "null".into());

    INDEX_HTML
        .replace("{{TITLE_JSON}}", &script_string(&view.title))
        .replace("{{NOW}}", &view.now)
        .replace("{{STATUS_KIND}}", view.status.kind)
        .replace("{{STATUS_TEXT}}", view.status.text)
        .replace("{{MOCK_CHECKED}}", if view.mock_forced { "checked" } else { "" })
        .replace("{{POLICY}}", view.policy)
        .replace("{{TIMEZONE_JSON}}", &timezone)
        .replace("{{NEXT_REFRESH_MS}}", &next_refresh)
        .replace("{{CHART}}", &view.chart_svg)
}

/// JSON string literal that cannot close the surrounding script element.
fn script_string(value: &str) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".into())
        .replace("</", "<\\/")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Occupancy</title>
  <style>
    :root {
      --bg: #f4f1f8;
      --card: #ffffff;
      --ink: #241b31;
      --muted: #6c6377;
      --accent: #452c63;
      --grid: rgba(36, 27, 49, 0.12);
      --shadow: 0 20px 50px rgba(69, 44, 99, 0.16);
    }

    :root[data-theme="dark"] {
      --bg: #16121c;
      --card: #221c2b;
      --ink: #ece6f5;
      --muted: #a79fb3;
      --accent: #b99ae0;
      --grid: rgba(236, 230, 245, 0.14);
      --shadow: 0 20px 50px rgba(0, 0, 0, 0.4);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Segoe UI", "Helvetica Neue", Arial, sans-serif;
      padding: 28px 18px 40px;
    }

    .app {
      width: min(1100px, 100%);
      margin: 0 auto;
      background: var(--card);
      border-radius: 24px;
      box-shadow: var(--shadow);
      padding: 28px 32px;
      display: grid;
      gap: 20px;
    }

    header {
      display: flex;
      flex-wrap: wrap;
      justify-content: space-between;
      align-items: flex-start;
      gap: 16px;
    }

    h1 {
      margin: 0;
      font-size: clamp(1.6rem, 3vw, 2.3rem);
      color: var(--accent);
    }

    .subtitle {
      margin: 4px 0 0;
      color: var(--muted);
    }

    .controls {
      display: flex;
      flex-wrap: wrap;
      gap: 10px;
      align-items: center;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 10px 18px;
      font-size: 0.95rem;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent);
      color: var(--card);
    }

    button.ghost {
      background: transparent;
      color: var(--ink);
      border: 1px solid var(--grid);
    }

    .toggle {
      display: inline-flex;
      gap: 6px;
      align-items: center;
      color: var(--muted);
      font-size: 0.9rem;
    }

    .meta {
      display: flex;
      flex-wrap: wrap;
      gap: 18px;
      align-items: center;
      color: var(--muted);
      font-size: 0.95rem;
    }

    .status {
      display: inline-flex;
      align-items: center;
      gap: 8px;
      font-weight: 600;
    }

    .status::before {
      content: "";
      width: 10px;
      height: 10px;
      border-radius: 50%;
      background: #9a93a3;
    }

    .status[data-kind="live"] {
      color: #2d7a4b;
    }

    .status[data-kind="live"]::before {
      background: #2d7a4b;
    }

    .status[data-kind="mock"] {
      color: #b4561b;
    }

    .status[data-kind="mock"]::before {
      background: #e0822f;
    }

    #chart svg {
      width: 100%;
      height: auto;
      display: block;
    }

    #chart .chart-grid {
      stroke: var(--grid);
    }

    #chart .chart-label {
      fill: var(--muted);
      font-size: 12px;
    }

    #chart .chart-title {
      fill: var(--ink);
      font-size: 15px;
      font-weight: 700;
    }

    #chart .chart-bar:hover rect {
      opacity: 0.8;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <div>
        <h1 id="title"></h1>
        <p class="subtitle" id="currentDateTime">{{NOW}}</p>
      </div>
      <div class="controls">
        <form id="refresh-form" method="post" action="/refresh">
          <button type="submit" id="refresh-btn">Refresh now</button>
        </form>
        <label class="toggle"><input type="checkbox" id="mock-toggle" {{MOCK_CHECKED}} /> Mock data</label>
        <button type="button" class="ghost" id="theme-toggle">Toggle theme</button>
      </div>
    </header>

    <section class="meta">
      <span class="status" id="status" data-kind="{{STATUS_KIND}}">{{STATUS_TEXT}}</span>
      <span>Next refresh in <strong id="countdown">--:--</strong></span>
      <span id="policy">{{POLICY}}</span>
      <span id="last-updated"></span>
    </section>

    <section id="chart">{{CHART}}</section>
  </main>

  <script>
    const TITLE = {{TITLE_JSON}};
    const TIMEZONE = {{TIMEZONE_JSON}};
    let nextRefreshAt = {{NEXT_REFRESH_MS}};
    let reloading = false;

    const el = (id) => document.getElementById(id);
    document.title = TITLE;
    el('title').textContent = TITLE;

    const updateDateTime = () => {
      el('currentDateTime').textContent = new Date().toLocaleString('en-US', {
        timeZone: TIMEZONE,
        weekday: 'long',
        year: 'numeric',
        month: 'long',
        day: 'numeric',
        hour: 'numeric',
        minute: '2-digit',
        second: '2-digit',
        timeZoneName: 'short'
      });
    };

    const updateCountdown = () => {
      if (nextRefreshAt === null) {
        el('countdown').textContent = '--:--';
        return;
      }
      const remaining = Math.max(0, Math.round((nextRefreshAt - Date.now()) / 1000));
      const minutes = Math.floor(remaining / 60);
      const seconds = String(remaining % 60).padStart(2, '0');
      el('countdown').textContent = `${minutes}:${seconds}`;
      if (remaining === 0 && !reloading && Date.now() - nextRefreshAt > 2000) {
        load();
      }
    };

    const apply = (view) => {
      const status = el('status');
      status.dataset.kind = view.status.kind;
      status.textContent = view.status.text;
      el('chart').innerHTML = view.chart_svg;
      el('mock-toggle').checked = view.mock_forced;
      el('policy').textContent = view.policy;
      el('last-updated').textContent = view.last_updated_utc ? `Data from ${view.last_updated_utc}` : '';
      nextRefreshAt = view.next_refresh_at ? Date.parse(view.next_refresh_at) : null;
    };

    const request = async (url, options = {}) => {
      const res = await fetch(url, {
        cache: 'no-store',
        headers: { 'content-type': 'application/json', 'Cache-Control': 'no-cache' },
        ...options
      });
      if (!res.ok) {
        throw new Error(`HTTP ${res.status}`);
      }
      return res.json();
    };

    const load = async () => {
      reloading = true;
      try {
        apply(await request('/api/dashboard'));
      } catch (err) {
        console.warn('dashboard state unavailable:', err);
      } finally {
        reloading = false;
      }
    };

    const reportVisibility = async (event) => {
      try {
        const result = await request('/api/visibility', {
          method: 'POST',
          body: JSON.stringify({ event })
        });
        if (result.refreshed) {
          await load();
        }
      } catch (err) {
        console.warn('visibility report failed:', err);
      }
    };

    el('refresh-form').addEventListener('submit', (event) => {
      event.preventDefault();
      request('/api/refresh', { method: 'POST' }).then(apply).catch((err) => console.warn(err));
    });

    el('mock-toggle').addEventListener('change', (event) => {
      request('/api/mock', {
        method: 'POST',
        body: JSON.stringify({ enabled: event.target.checked })
      }).then(apply).catch((err) => console.warn(err));
    });

    const applyTheme = (theme) => {
      document.documentElement.dataset.theme = theme;
      localStorage.setItem('theme', theme);
    };
    applyTheme(localStorage.getItem('theme') || 'light');
    el('theme-toggle').addEventListener('click', () => {
      applyTheme(document.documentElement.dataset.theme === 'dark' ? 'light' : 'dark');
    });

    document.addEventListener('visibilitychange', () => {
      if (!document.hidden) {
        reportVisibility('visible');
      }
    });
    window.addEventListener('focus', () => reportVisibility('focus'));

    updateDateTime();
    updateCountdown();
    setInterval(() => {
      updateDateTime();
      updateCountdown();
    }, 1000);
    setInterval(load, 60 * 1000);
  </script>
</body>
</html>
"#;
