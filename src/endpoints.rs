use url::Url;

/// Every API endpoint the front end talks to, derived from one base URL.
///
/// Any path prefix on the base (e.g. `https://host/miroma`) is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    auth: Url,
    refresh: Url,
    logout: Url,
    incomes: Url,
    expenses: Url,
    expense_categories: Url,
    budgets: Url,
    budget_categories: Url,
    financial_summary: Url,
    event_log: Url,
}

impl ApiEndpoints {
    #[must_use]
    pub fn new(base: &Url) -> Self {
        Self {
            auth: endpoint(base, "/api/auth"),
            refresh: endpoint(base, "/api/auth/refresh"),
            logout: endpoint(base, "/api/auth/logout"),
            incomes: endpoint(base, "/api/ingresos"),
            expenses: endpoint(base, "/api/egresos"),
            expense_categories: endpoint(base, "/api/categorias-egresos"),
            budgets: endpoint(base, "/api/presupuestos"),
            budget_categories: endpoint(base, "/api/presupuestos-categorias"),
            financial_summary: endpoint(base, "/api/resumen-financiero"),
            event_log: endpoint(base, "/api/log-eventos"),
        }
    }

    /// Authentication root (`/api/auth`).
    #[must_use]
    pub fn auth(&self) -> &Url {
        &self.auth
    }

    /// Session refresh (`/api/auth/refresh`).
    #[must_use]
    pub fn refresh(&self) -> &Url {
        &self.refresh
    }

    /// Logout notification (`/api/auth/logout`).
    #[must_use]
    pub fn logout(&self) -> &Url {
        &self.logout
    }

    #[must_use]
    pub fn incomes(&self) -> &Url {
        &self.incomes
    }

    #[must_use]
    pub fn expenses(&self) -> &Url {
        &self.expenses
    }

    #[must_use]
    pub fn expense_categories(&self) -> &Url {
        &self.expense_categories
    }

    #[must_use]
    pub fn budgets(&self) -> &Url {
        &self.budgets
    }

    #[must_use]
    pub fn budget_categories(&self) -> &Url {
        &self.budget_categories
    }

    #[must_use]
    pub fn financial_summary(&self) -> &Url {
        &self.financial_summary
    }

    #[must_use]
    pub fn event_log(&self) -> &Url {
        &self.event_log
    }
}

fn endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/').to_owned();
    url.set_path(&format!("{prefix}{path}"));
    url.set_query(None);
    url.set_fragment(None);
    url
}
