use axum::response::Html;

const LOGIN_PAGE: &str = r##"<!doctype html>
<html lang="pt-BR">
<head>
  <meta charset="utf-8">
  <title>Nivela Pro</title>
  <script src="https://unpkg.com/htmx.org@1.9.12"></script>
</head>
<body>
  <main>
    <h1>Nivela Pro</h1>
    <form hx-post="/login" hx-target="#login-error">
      <input type="email" name="email" placeholder="E-mail" required>
      <input type="password" name="password" placeholder="Senha" required>
      <button type="submit">Entrar</button>
    </form>
    <div id="login-error"></div>
  </main>
</body>
</html>
"##;

pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

pub async fn health_check() -> &'static str {
    "OK"
}
