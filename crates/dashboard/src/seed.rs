//! Placeholder data for local development and seeding a fresh project.

use serde_json::{Value, json};
use uuid::Uuid;

/// Account available in memory mode.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderUser {
    pub id: &'static str,
    pub name: &'static str,
    pub email: &'static str,
    pub password: &'static str,
}

pub const PLACEHOLDER_USER: PlaceholderUser = PlaceholderUser {
    id: "410544b2-4001-4271-9855-fec4b6a6442a",
    name: "User",
    email: "user@nextmail.com",
    password: "123456",
};

// (id, name, email, image_url)
const CUSTOMERS: [(&str, &str, &str, &str); 6] = [
    (
        "d6e15727-9fe1-4961-8c5b-ea44a9bd81aa",
        "Evil Rabbit",
        "evil@rabbit.com",
        "/customers/evil-rabbit.png",
    ),
    (
        "3958dc9e-712f-4377-85e9-fec4b6a6442a",
        "Delba de Oliveira",
        "delba@oliveira.com",
        "/customers/delba-de-oliveira.png",
    ),
    (
        "3958dc9e-742f-4377-85e9-fec4b6a6442a",
        "Lee Robinson",
        "lee@robinson.com",
        "/customers/lee-robinson.png",
    ),
    (
        "76d65c26-f784-44a2-ac19-586678f7c2f2",
        "Michael Novotny",
        "michael@novotny.com",
        "/customers/michael-novotny.png",
    ),
    (
        "cc27c14a-0acf-4f4a-a6c9-d45682c144b9",
        "Amy Burns",
        "amy@burns.com",
        "/customers/amy-burns.png",
    ),
    (
        "13d07535-c59e-4157-a011-f8d2ef4e0cbb",
        "Balazs Orban",
        "balazs@orban.com",
        "/customers/balazs-orban.png",
    ),
];

// (customer index, amount in cents, status, invoice_date)
const INVOICES: [(usize, i64, &str, &str); 13] = [
    (0, 15795, "pending", "2022-12-06"),
    (1, 20348, "pending", "2022-11-14"),
    (4, 3040, "paid", "2022-10-29"),
    (3, 44800, "paid", "2023-09-10"),
    (5, 34577, "pending", "2023-08-05"),
    (2, 54246, "pending", "2023-07-16"),
    (0, 666, "pending", "2023-06-27"),
    (3, 32545, "paid", "2023-06-09"),
    (4, 1250, "paid", "2023-06-17"),
    (5, 8546, "paid", "2023-06-07"),
    (1, 500, "paid", "2023-08-19"),
    (5, 8945, "paid", "2023-06-03"),
    (2, 1000, "paid", "2022-06-05"),
];

const REVENUE: [(&str, i64); 12] = [
    ("Jan", 2000),
    ("Feb", 1800),
    ("Mar", 2200),
    ("Apr", 2500),
    ("May", 2300),
    ("Jun", 3200),
    ("Jul", 3500),
    ("Aug", 3700),
    ("Sep", 2500),
    ("Oct", 2800),
    ("Nov", 3000),
    ("Dec", 4800),
];

/// Placeholder rows, one vector per table.
///
/// Invoice rows carry no `id`; the database (or [`Placeholder::tables`])
/// assigns one.
#[derive(Debug, Clone)]
pub struct Placeholder {
    pub customers: Vec<Value>,
    pub invoices: Vec<Value>,
    pub revenue: Vec<Value>,
}

impl Placeholder {
    /// Table name and rows pairs, with fresh ids on every invoice.
    #[must_use]
    pub fn tables(self) -> [(&'static str, Vec<Value>); 3] {
        let invoices = self
            .invoices
            .into_iter()
            .map(|mut row| {
                if let Some(object) = row.as_object_mut() {
                    object
                        .entry("id")
                        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
                }
                row
            })
            .collect();
        [
            ("customers", self.customers),
            ("invoices", invoices),
            ("revenue", self.revenue),
        ]
    }
}

/// Build the placeholder data set.
#[must_use]
pub fn placeholder() -> Placeholder {
    let customers = CUSTOMERS
        .iter()
        .map(|(id, name, email, image_url)| {
            json!({ "id": id, "name": name, "email": email, "image_url": image_url })
        })
        .collect();

    let invoices = INVOICES
        .iter()
        .map(|(customer, amount, status, date)| {
            json!({
                "customer_id": CUSTOMERS[*customer].0,
                "amount": amount,
                "status": status,
                "invoice_date": date,
            })
        })
        .collect();

    let revenue = REVENUE
        .iter()
        .map(|(month, revenue)| json!({ "month": month, "revenue": revenue }))
        .collect();

    Placeholder {
        customers,
        invoices,
        revenue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_invoice_references_a_customer() {
        let data = placeholder();
        for invoice in &data.invoices {
            let customer_id = &invoice["customer_id"];
            assert!(data.customers.iter().any(|c| &c["id"] == customer_id));
        }
    }

    #[test]
    fn test_tables_assign_invoice_ids() {
        let [_, (name, invoices), _] = placeholder().tables();
        assert_eq!(name, "invoices");
        assert_eq!(invoices.len(), INVOICES.len());
        assert!(invoices.iter().all(|i| i["id"].is_string()));
    }

    #[test]
    fn test_twelve_months_of_revenue() {
        assert_eq!(placeholder().revenue.len(), 12);
    }
}
