//! Dashboard handler: the single-page enhancer explorer.

use axum::{extract::State, response::Html};
use enhancerscope_data::DatasetSummary;

use crate::router::XSRF_HEADER;
use crate::state::SharedState;

/// Navigation HTML shared across pages
pub const NAV_HTML: &str = r#"<nav class="navbar">
    <a class="brand" href="/">EnhancerScope</a>
    <div class="nav-links">
        <a href="/">Explorer</a>
        <a href="/api/summary">Summary</a>
        <a href="/api/integrity">Integrity</a>
        <a href="/health">Health</a>
    </div>
</nav>"#;

pub async fn dashboard(State(state): State<SharedState>) -> Html<String> {
    Html(render_dashboard(&state.summary, &state.xsrf_token))
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_summary(summary: &DatasetSummary) -> String {
    let mean_score = summary.scores.map(|s| format!("{:.4}", s.mean)).unwrap_or_else(|| "—".into());
    let common = summary.most_common_cell_type.as_deref().map(escape_html).unwrap_or_else(|| "—".into());
    format!(
        r#"<div class="stat-grid">
        <div class="stat"><div class="stat-val">{}</div><div class="stat-label">Enhancers</div></div>
        <div class="stat"><div class="stat-val">{}</div><div class="stat-label">Cell Types</div></div>
        <div class="stat"><div class="stat-val">{}</div><div class="stat-label">Data Points</div></div>
        <div class="stat"><div class="stat-val">{}</div><div class="stat-label">Mean Accessibility</div></div>
        <div class="stat"><div class="stat-val">{:.0} bp</div><div class="stat-label">Mean Length</div></div>
        <div class="stat"><div class="stat-val small">{}</div><div class="stat-label">Most Common Cell Type</div></div>
    </div>"#,
        summary.total_enhancers,
        summary.total_cell_types,
        summary.total_records,
        mean_score,
        summary.mean_enhancer_length,
        common,
    )
}

fn render_dashboard(summary: &DatasetSummary, xsrf_token: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="xsrf-header" content="{xsrf_header}">
    <meta name="xsrf-token" content="{xsrf_token}">
    <title>Enhancer Explorer — EnhancerScope</title>
    <script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
    <style>
        body {{ font-family: system-ui, sans-serif; margin: 0; background: #f7f8fa; color: #1f2933; }}
        .navbar {{ display: flex; justify-content: space-between; padding: 0.75rem 1.5rem; background: #1f2933; }}
        .navbar a {{ color: #e4e7eb; text-decoration: none; margin-left: 1rem; }}
        .navbar .brand {{ font-weight: 700; margin-left: 0; }}
        .layout {{ display: grid; grid-template-columns: 280px 1fr; gap: 1.5rem; padding: 1.5rem; }}
        .card {{ background: white; border-radius: 8px; padding: 1rem; box-shadow: 0 1px 3px rgba(0,0,0,0.08); margin-bottom: 1rem; }}
        .filters label {{ display: block; font-size: 0.8rem; text-transform: uppercase; color: #616e7c; margin-top: 0.75rem; }}
        .filters select {{ width: 100%; padding: 0.35rem; }}
        .stat-grid {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(130px, 1fr)); gap: 0.75rem; text-align: center; }}
        .stat-val {{ font-size: 1.6rem; font-weight: 700; }}
        .stat-val.small {{ font-size: 1rem; }}
        .stat-label {{ font-size: 0.75rem; color: #616e7c; text-transform: uppercase; }}
        .empty {{ color: #9aa5b1; text-align: center; padding: 2rem; }}
        .error {{ color: #c62828; }}
        .imaging img {{ max-width: 100%; border: 1px solid #e4e7eb; }}
        .imaging iframe {{ width: 100%; height: 480px; border: 0; }}
        table {{ width: 100%; border-collapse: collapse; font-size: 0.9rem; }}
        th, td {{ text-align: left; padding: 0.35rem 0.5rem; border-bottom: 1px solid #e4e7eb; }}
    </style>
</head>
<body>
{nav}
<main class="layout">
    <aside>
        <div class="card filters">
            <h3>Filters</h3>
            <label for="f-enhancer">Enhancer</label><select id="f-enhancer" data-dim="enhancer"></select>
            <label for="f-cargo">Cargo</label><select id="f-cargo" data-dim="cargo"></select>
            <label for="f-experiment">Experiment</label><select id="f-experiment" data-dim="experiment"></select>
            <label for="f-gene">Proximal Gene</label><select id="f-gene" data-dim="gene"></select>
            <label for="f-gc">GC Delivered</label><select id="f-gc" data-dim="gc_delivered"></select>
            <label for="f-cell-type">Cell Type</label><select id="f-cell-type" data-dim="cell_type"></select>
            <p><button id="reset">Reset filters</button></p>
        </div>
        <div class="card">
            <h3>Download</h3>
            <select id="export-format"><option value="csv">CSV</option><option value="tsv">TSV</option></select>
            <button id="download">Download data</button>
            <p id="download-status"></p>
        </div>
    </aside>
    <section>
        <div class="card"><h3>Dataset Overview</h3>{summary}</div>
        <div class="card"><div id="figure"></div><p id="figure-empty" class="empty" hidden></p></div>
        <div class="card"><h3>Statistics</h3><div id="stats"></div></div>
        <div class="card imaging"><h3>Imaging</h3><div id="imaging"><p class="empty">Select an enhancer to view imaging.</p></div></div>
        <div class="card"><h3>Enhancers</h3><div id="catalog"></div></div>
        <div class="card"><details><summary>View Raw Data</summary><div id="preview"></div></details></div>
        <div class="card"><h3>Summary Overview</h3><div id="overview"></div><p id="overview-empty" class="empty" hidden>No data for the summary overview.</p></div>
    </section>
</main>
<script>
const DIMS = ["enhancer", "cargo", "experiment", "gene", "gc_delivered", "cell_type"];
const XSRF_HEADER = document.querySelector('meta[name="xsrf-header"]').content;
const XSRF_TOKEN = document.querySelector('meta[name="xsrf-token"]').content;
const OPTION_KEYS = {{ enhancer: "enhancers", cargo: "cargos", experiment: "experiments",
    gene: "genes", gc_delivered: "gc_delivered", cell_type: "cell_types" }};

function esc(s) {{
    return String(s).replace(/[&<>"']/g, c => ({{"&": "&amp;", "<": "&lt;", ">": "&gt;", '"': "&quot;", "'": "&#39;"}})[c]);
}}

function currentSelections() {{
    const s = {{}};
    for (const el of document.querySelectorAll("select[data-dim]")) {{
        if (el.value && el.value !== "All") s[el.dataset.dim] = el.value;
    }}
    return s;
}}

function fillSelect(dim, values, selected) {{
    const el = document.querySelector(`select[data-dim="${{dim}}"]`);
    const opts = ["All"].concat(values);
    el.innerHTML = opts.map(v => `<option${{v === selected ? " selected" : ""}}>${{esc(v)}}</option>`).join("");
}}

function renderStats(stats) {{
    const el = document.getElementById("stats");
    if (!stats) {{ el.innerHTML = '<p class="empty">No data for the current selection.</p>'; return; }}
    const f = v => Number(v).toFixed(4);
    el.innerHTML = `<div class="stat-grid">
        <div class="stat"><div class="stat-val">${{stats.count}}</div><div class="stat-label">Data Points</div></div>
        <div class="stat"><div class="stat-val">${{f(stats.mean)}}</div><div class="stat-label">Mean</div></div>
        <div class="stat"><div class="stat-val">${{f(stats.median)}}</div><div class="stat-label">Median</div></div>
        <div class="stat"><div class="stat-val">${{f(stats.max)}}</div><div class="stat-label">Max</div></div>
        <div class="stat"><div class="stat-val">${{f(stats.std)}}</div><div class="stat-label">Std Dev</div></div>
        <div class="stat"><div class="stat-val small">${{esc(stats.top_cell_type || "—")}}</div><div class="stat-label">Top Cell Type</div></div>
    </div>`;
}}

function renderImaging(imaging) {{
    const el = document.getElementById("imaging");
    if (!imaging) {{ el.innerHTML = '<p class="empty">Select an enhancer to view imaging.</p>'; return; }}
    if (imaging.status !== "available") {{ el.innerHTML = `<p class="empty">${{esc(imaging.reason)}}</p>`; return; }}
    el.innerHTML = `<p>${{esc(imaging.modality)}} — ${{esc(imaging.experiment)}}</p>` + imaging.assets.map(a =>
        a.kind === "viewer3d"
            ? `<h4>${{esc(a.label)}}</h4><iframe src="${{esc(a.url)}}" loading="lazy"></iframe><p><a href="${{esc(a.url)}}" target="_blank" rel="noopener">Open in new tab</a></p>`
            : `<h4>${{esc(a.label)}}</h4><img src="${{esc(a.url)}}" alt="${{esc(a.label)}}" loading="lazy">`
    ).join("");
}}

function renderCatalog(catalog) {{
    const el = document.getElementById("catalog");
    if (!catalog.rows.length) {{ el.innerHTML = '<p class="empty">No enhancers match.</p>'; return; }}
    el.innerHTML = `<p>${{catalog.rows.length}} enhancers · ${{catalog.unique_cargos}} cargos · ${{catalog.unique_experiments}} experiments · ${{catalog.unique_genes}} genes</p>
        <table><thead><tr><th>Enhancer</th><th>Location</th><th>Length</th><th>Cargo</th><th>Experiment</th><th>Gene</th><th>GC</th><th>Experiments</th></tr></thead><tbody>` +
        catalog.rows.map(r => `<tr><td>${{esc(r.enhancer_id)}}</td><td>${{esc(r.location)}}</td><td>${{r.length.toLocaleString()}}</td>
            <td>${{esc(r.cargo)}}</td><td>${{esc(r.experiment)}}</td><td>${{esc(r.proximal_gene)}}</td>
            <td>${{esc(r.gc_delivered || "—")}}</td><td>${{r.experiment_count}}</td></tr>`).join("") + "</tbody></table>";
}}

function renderPreview(rows, total) {{
    const el = document.getElementById("preview");
    if (!rows.length) {{ el.innerHTML = '<p class="empty">No rows.</p>'; return; }}
    const cols = ["enhancer_id", "chr", "start", "end", "cell_type", "position_index", "accessibility_score"];
    el.innerHTML = `<p>Showing ${{rows.length}} of ${{total}} rows. Download for the full table.</p>
        <table><thead><tr>${{cols.map(c => `<th>${{c}}</th>`).join("")}}</tr></thead><tbody>` +
        rows.map(r => "<tr>" + cols.map(c => `<td>${{esc(r[c])}}</td>`).join("") + "</tr>").join("") + "</tbody></table>";
}}

async function renderOverview(selections) {{
    const res = await fetch("/api/overview?" + new URLSearchParams(selections).toString());
    const empty = document.getElementById("overview-empty");
    if (!res.ok) {{ Plotly.purge("overview"); empty.hidden = false; return; }}
    empty.hidden = true;
    const body = await res.json();
    Plotly.react("overview", body.figure.data, body.figure.layout, {{ responsive: true }});
}}

async function refresh(selections) {{
    const res = await fetch("/api/view", {{
        method: "POST",
        headers: {{ "Content-Type": "application/json", [XSRF_HEADER]: XSRF_TOKEN }},
        body: JSON.stringify(selections),
    }});
    const view = await res.json();
    if (!res.ok) {{ document.getElementById("stats").innerHTML = `<p class="error">${{esc(view.error)}}</p>`; return; }}

    for (const dim of DIMS) {{
        const raw = view.options[OPTION_KEYS[dim]];
        const values = dim === "cell_type" ? raw.map(c => c.name) : raw;
        fillSelect(dim, values, view.selections[dim] || "All");
    }}

    const empty = document.getElementById("figure-empty");
    if (view.empty) {{
        empty.hidden = false;
        empty.textContent = "No data matches the current filters. Try another combination.";
    }} else {{
        empty.hidden = true;
    }}
    Plotly.react("figure", view.figure.data, view.figure.layout, {{ responsive: true }});
    renderStats(view.summary);
    renderImaging(view.imaging);
    renderCatalog(view.catalog);
    renderPreview(view.preview, view.row_count);
    renderOverview(selections);
    history.replaceState(null, "", "?" + new URLSearchParams(selections).toString());
}}

async function download() {{
    const status = document.getElementById("download-status");
    const format = document.getElementById("export-format").value;
    const params = new URLSearchParams({{ ...currentSelections(), format }});
    status.textContent = "Preparing…";
    try {{
        const res = await fetch("/api/export?" + params.toString());
        if (!res.ok) throw new Error((await res.json()).error);
        const name = (res.headers.get("Content-Disposition") || "").match(/filename="([^"]+)"/);
        const url = URL.createObjectURL(await res.blob());
        const a = Object.assign(document.createElement("a"), {{ href: url, download: name ? name[1] : "export." + format }});
        a.click();
        URL.revokeObjectURL(url);
        status.textContent = "";
    }} catch (e) {{
        status.innerHTML = `<span class="error">Download failed: ${{esc(e.message)}}. Try again.</span>`;
    }}
}}

document.querySelectorAll("select[data-dim]").forEach(el => el.addEventListener("change", () => refresh(currentSelections())));
document.getElementById("reset").addEventListener("click", () => refresh({{}}));
document.getElementById("download").addEventListener("click", download);
refresh(Object.fromEntries(new URLSearchParams(location.search)));
</script>
</body>
</html>"##,
        xsrf_header = XSRF_HEADER,
        xsrf_token = escape_html(xsrf_token),
        nav = NAV_HTML,
        summary = render_summary(summary),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}
